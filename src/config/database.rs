//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Multi-column uniqueness rules that entity attributes cannot express
//! are added as explicit unique indexes afterwards.

use crate::entities::{
    AcademicProgress, AcademicRecord, Attendance, Course, Enrollment, Professor, SemesterGpa,
    Student, Transcript, User, academic_record, attendance, course, semester_gpa,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://registrar.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file, created on first use.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E, C>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve on every backend.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Student).await?;
    create_table(db, &schema, Professor).await?;
    create_table(db, &schema, Course).await?;
    create_table(db, &schema, Enrollment).await?;
    create_table(db, &schema, AcademicRecord).await?;
    create_table(db, &schema, SemesterGpa).await?;
    create_table(db, &schema, AcademicProgress).await?;
    create_table(db, &schema, Transcript).await?;
    create_table(db, &schema, Attendance).await?;

    let indexes = [
        Index::create()
            .name("idx_courses_code_term")
            .table(Course)
            .col(course::Column::CourseCode)
            .col(course::Column::Semester)
            .col(course::Column::Year)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_academic_records_student_course_term")
            .table(AcademicRecord)
            .col(academic_record::Column::StudentId)
            .col(academic_record::Column::CourseId)
            .col(academic_record::Column::Semester)
            .col(academic_record::Column::Year)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_semester_gpas_student_term")
            .table(SemesterGpa)
            .col(semester_gpa::Column::StudentId)
            .col(semester_gpa::Column::Semester)
            .col(semester_gpa::Column::Year)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_attendance_student_course_date")
            .table(Attendance)
            .col(attendance::Column::StudentId)
            .col(attendance::Column::CourseId)
            .col(attendance::Column::AttendanceDate)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    info!("Database tables ensured.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        AcademicRecordModel, CourseModel, EnrollmentModel, TranscriptModel, UserModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<CourseModel> = Course::find().limit(1).all(&db).await?;
        let _: Vec<EnrollmentModel> = Enrollment::find().limit(1).all(&db).await?;
        let _: Vec<AcademicRecordModel> = AcademicRecord::find().limit(1).all(&db).await?;
        let _: Vec<TranscriptModel> = Transcript::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_attendance_session_is_conflict() -> Result<()> {
        use crate::entities::AttendanceStatus;
        use crate::errors::Error;
        use crate::test_utils::{
            create_test_course, create_test_professor, create_test_student, setup_test_db,
        };
        use chrono::{NaiveDate, Utc};
        use sea_orm::{ActiveModelTrait, Set};

        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        let mark = || attendance::ActiveModel {
            student_id: Set(student.id),
            course_id: Set(course.id),
            attendance_date: Set(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()),
            status: Set(AttendanceStatus::Present),
            late_minutes: Set(0),
            notes: Set(None),
            recorded_by: Set(professor.id),
            recorded_at: Set(Utc::now()),
            ..Default::default()
        };

        mark().insert(&db).await?;
        let duplicate = mark().insert(&db).await.map_err(Error::from);
        assert!(matches!(duplicate, Err(Error::Conflict { .. })));
        assert_eq!(Attendance::find().all(&db).await?.len(), 1);
        Ok(())
    }
}
