//! Degree progress business logic.
//!
//! A student opts into progress tracking by opening a progress record for a
//! degree program. From then on every ledger write recomputes it through
//! [`refresh_progress`]. Requirements are copied from configuration when the
//! record is opened so later policy changes do not move finished degrees.

use crate::{
    config::settings::AppConfig,
    core::{
        accounts::{StudentProfileUpdate, update_student_profile},
        gpa::{self, DegreeProgress, ProgressContext, Requirements},
        records::load_ledger,
    },
    entities::{AcademicProgress, Student, academic_progress, student},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Input for opening a progress record
#[derive(Debug, Clone, Deserialize)]
pub struct NewProgress {
    /// Degree name, e.g. "BSc Computer Science"
    pub degree_program: String,
    /// Academic year the requirements come from
    pub catalog_year: i32,
    /// Defaults to the student's declared major
    pub major: Option<String>,
    /// Chosen graduation date
    pub expected_graduation_date: Option<NaiveDate>,
}

/// Editable progress fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressUpdate {
    /// New degree name
    pub degree_program: Option<String>,
    /// New chosen graduation date
    pub expected_graduation_date: Option<NaiveDate>,
}

/// Progress report with freshly computed figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    /// Student profile id
    pub student_id: i64,
    /// Degree name
    pub degree_program: String,
    /// Major the requirements use
    pub major: String,
    /// Catalog year
    pub catalog_year: i32,
    /// GPA over all counted records
    pub cumulative_gpa: f64,
    /// GPA over major courses
    pub major_gpa: f64,
    /// GPA of the latest term
    pub semester_gpa: f64,
    /// Credit buckets and derived figures
    #[serde(flatten)]
    pub progress: DegreeProgress,
}

fn requirements_of(row: &academic_progress::Model) -> Requirements {
    Requirements {
        total: row.total_credits_required,
        major: row.major_credits_required,
        general_education: row.general_education_credits_required,
        elective: row.elective_credits_required,
    }
}

async fn compute<C>(
    db: &C,
    config: &AppConfig,
    student: &student::Model,
    row: &academic_progress::Model,
) -> Result<(gpa::GpaSummary, DegreeProgress)>
where
    C: ConnectionTrait,
{
    let ledger = load_ledger(db, student.id).await?;
    let major = row.major.as_str();
    let summary = gpa::summarize(&ledger, Some(major), config.grading);
    let ctx = ProgressContext {
        major: Some(major),
        requirements: requirements_of(row),
        policy: &config.progress,
        catalog_year: row.catalog_year,
        expected_graduation_date: student.graduation_date,
        as_of: Utc::now().date_naive(),
    };
    let progress = gpa::degree_progress(&ledger, &summary, &ctx);
    Ok((summary, progress))
}

/// Recomputes the cached progress row, if the student has one.
pub async fn refresh_progress<C>(
    db: &C,
    config: &AppConfig,
    student_id: i64,
) -> Result<Option<academic_progress::Model>>
where
    C: ConnectionTrait,
{
    let Some(row) = AcademicProgress::find()
        .filter(academic_progress::Column::StudentId.eq(student_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;

    let (summary, progress) = compute(db, config, &student, &row).await?;

    let mut active: academic_progress::ActiveModel = row.into();
    active.total_credits_earned = Set(progress.total_credits_earned);
    active.major_credits_earned = Set(progress.major_credits_earned);
    active.general_education_credits_earned = Set(progress.general_education_credits_earned);
    active.elective_credits_earned = Set(progress.elective_credits_earned);
    active.cumulative_gpa = Set(summary.cumulative_gpa);
    active.major_gpa = Set(summary.major_gpa);
    active.semester_gpa = Set(summary.semester_gpa);
    active.is_on_track = Set(progress.is_on_track);
    active.expected_graduation_date = Set(progress.expected_graduation_date);
    active.updated_at = Set(Utc::now());
    Ok(Some(active.update(db).await?))
}

/// Opens progress tracking for the student.
///
/// # Errors
/// [`Error::Conflict`] when a record exists, [`Error::Validation`] when no
/// major is given or declared.
#[instrument(skip(db, config, student, new), fields(student_id = student.id))]
pub async fn open_progress(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    new: NewProgress,
) -> Result<academic_progress::Model> {
    let degree_program = new.degree_program.trim().to_string();
    if degree_program.is_empty() {
        return Err(Error::validation("Degree program cannot be empty"));
    }
    let major = new
        .major
        .or_else(|| student.major.clone())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::validation("A major is required to track degree progress"))?;

    let txn = db.begin().await?;
    let existing = AcademicProgress::find()
        .filter(academic_progress::Column::StudentId.eq(student.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::conflict("Academic progress record already exists"));
    }

    if new.expected_graduation_date.is_some() {
        update_student_profile(
            &txn,
            student,
            StudentProfileUpdate {
                graduation_date: new.expected_graduation_date,
                ..Default::default()
            },
        )
        .await?;
    }

    let policy = &config.progress;
    let now = Utc::now();
    academic_progress::ActiveModel {
        student_id: Set(student.id),
        degree_program: Set(degree_program),
        major: Set(major),
        catalog_year: Set(new.catalog_year),
        total_credits_required: Set(policy.total_credits_required),
        major_credits_required: Set(policy.major_credits_required),
        general_education_credits_required: Set(policy.general_education_credits_required),
        elective_credits_required: Set(policy.elective_credits_required),
        total_credits_earned: Set(0),
        major_credits_earned: Set(0),
        general_education_credits_earned: Set(0),
        elective_credits_earned: Set(0),
        cumulative_gpa: Set(0.0),
        major_gpa: Set(0.0),
        semester_gpa: Set(0.0),
        is_on_track: Set(true),
        expected_graduation_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let row = refresh_progress(&txn, config, student.id)
        .await?
        .ok_or_else(|| Error::not_found("Academic progress", student.id))?;
    txn.commit().await?;
    info!(student_id = student.id, "Opened academic progress for {}", row.degree_program);
    Ok(row)
}

/// The student's progress row.
pub async fn get_progress(db: &DatabaseConnection, student: &student::Model) -> Result<academic_progress::Model> {
    AcademicProgress::find()
        .filter(academic_progress::Column::StudentId.eq(student.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Academic progress", &student.student_id))
}

/// Changes the degree program or the student-chosen graduation date.
pub async fn update_progress(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    update: ProgressUpdate,
) -> Result<academic_progress::Model> {
    let txn = db.begin().await?;
    let row = AcademicProgress::find()
        .filter(academic_progress::Column::StudentId.eq(student.id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Academic progress", &student.student_id))?;

    if let Some(degree_program) = update.degree_program {
        let degree_program = degree_program.trim().to_string();
        if degree_program.is_empty() {
            return Err(Error::validation("Degree program cannot be empty"));
        }
        let mut active: academic_progress::ActiveModel = row.into();
        active.degree_program = Set(degree_program);
        active.update(&txn).await?;
    }
    if update.expected_graduation_date.is_some() {
        update_student_profile(
            &txn,
            student,
            StudentProfileUpdate {
                graduation_date: update.expected_graduation_date,
                ..Default::default()
            },
        )
        .await?;
    }

    let row = refresh_progress(&txn, config, student.id)
        .await?
        .ok_or_else(|| Error::not_found("Academic progress", &student.student_id))?;
    txn.commit().await?;
    Ok(row)
}

/// Computes the progress report from the ledger without touching the cache.
pub async fn progress_summary(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
) -> Result<ProgressSummary> {
    let row = get_progress(db, student).await?;
    let (summary, progress) = compute(db, config, student, &row).await?;
    Ok(ProgressSummary {
        student_id: student.id,
        degree_program: row.degree_program,
        major: row.major,
        catalog_year: row.catalog_year,
        cumulative_gpa: summary.cumulative_gpa,
        major_gpa: summary.major_gpa,
        semester_gpa: summary.semester_gpa,
        progress,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use chrono::Datelike;
    use crate::core::{
        grades::{GradeSubmission, LetterGrade},
        records::grade_student,
    };
    use crate::test_utils::{
        create_test_course, create_test_professor, create_test_student, enroll_test_student, setup_test_db,
        test_config,
    };

    fn new_progress() -> NewProgress {
        NewProgress {
            degree_program: "BSc Computer Science".to_string(),
            catalog_year: Utc::now().date_naive().year(),
            major: None,
            expected_graduation_date: None,
        }
    }

    #[tokio::test]
    async fn test_open_progress_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;

        let row = open_progress(&db, &config, &student, new_progress()).await?;
        assert_eq!(row.major, "Computer Science");
        assert_eq!(row.total_credits_required, 120);
        assert_eq!(row.total_credits_earned, 0);
        assert_eq!(row.cumulative_gpa, 0.0);
        assert!(row.is_on_track);
        assert!(row.expected_graduation_date.is_some());

        let again = open_progress(&db, &config, &student, new_progress()).await;
        assert!(matches!(again, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_progress_requires_major() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let mut undeclared = student.clone();
        undeclared.major = None;

        let result = open_progress(&db, &test_config(), &undeclared, new_progress()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let missing = get_progress(&db, &student).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_grading_refreshes_progress() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "Computer Science").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        open_progress(&db, &config, &student, new_progress()).await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &student, &course).await?;

        let submission = GradeSubmission {
            letter_grade: Some(LetterGrade::BPlus),
            ..Default::default()
        };
        grade_student(&db, &config, &professor, course.id, student.id, submission).await?;

        let row = get_progress(&db, &student).await?;
        assert_eq!(row.total_credits_earned, 3);
        assert_eq!(row.major_credits_earned, 3);
        assert_eq!(row.cumulative_gpa, 3.3);
        assert_eq!(row.semester_gpa, 3.3);

        let summary = progress_summary(&db, &config, &student).await?;
        assert_eq!(summary.progress.credits_remaining, 117);
        assert_eq!(summary.progress.completion_percentage, 2.5);
        assert_eq!(summary.progress.major_completion_percentage, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_expected_graduation() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        open_progress(&db, &config, &student, new_progress()).await?;

        let date = NaiveDate::from_ymd_opt(2030, 5, 20).unwrap();
        let row = update_progress(
            &db,
            &config,
            &student,
            ProgressUpdate {
                degree_program: Some("BA Computer Science".to_string()),
                expected_graduation_date: Some(date),
            },
        )
        .await?;
        assert_eq!(row.degree_program, "BA Computer Science");
        assert_eq!(row.expected_graduation_date, Some(date));

        let student = Student::find_by_id(student.id).one(&db).await?.unwrap();
        assert_eq!(student.graduation_date, Some(date));
        Ok(())
    }
}
