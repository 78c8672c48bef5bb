//! Student directory for professors.
//!
//! A professor sees the students enrolled in any of their courses plus the
//! students majoring in their department. Grade detail is narrower: records
//! and GPA are only available for students the professor teaches, and only
//! rows from the professor's own courses go into them.

use crate::{
    config::settings::AppConfig,
    core::{
        access::{Actor, Capability, authorize},
        gpa::GpaSummary,
        records::{self, GradeHistoryEntry},
    },
    entities::{Course, Enrollment, Student, User, course, enrollment, professor, student},
    errors::{Error, Result},
};
use sea_orm::{
    Condition, QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};

/// Directory listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryFilter {
    /// Matched against names and student number
    pub search: Option<String>,
    /// Exact major
    pub major: Option<String>,
    /// Exact year level
    pub year_level: Option<String>,
}

/// A student profile with contact email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    /// The student profile
    #[serde(flatten)]
    pub student: student::Model,
    /// Login email of the owning user
    pub email: Option<String>,
}

async fn taught_student_ids(db: &DatabaseConnection, professor: &professor::Model) -> Result<Vec<i64>> {
    let course_ids: Vec<i64> = Course::find()
        .select_only()
        .column(course::Column::Id)
        .filter(course::Column::ProfessorId.eq(professor.id))
        .into_tuple()
        .all(db)
        .await?;
    if course_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut student_ids: Vec<i64> = Enrollment::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::CourseId.is_in(course_ids))
        .into_tuple()
        .all(db)
        .await?;
    student_ids.sort_unstable();
    student_ids.dedup();
    Ok(student_ids)
}

/// Lists students visible to the professor.
pub async fn list_students(
    db: &DatabaseConnection,
    professor: &professor::Model,
    filter: &DirectoryFilter,
) -> Result<Vec<DirectoryEntry>> {
    let taught = taught_student_ids(db, professor).await?;
    let mut scope = Condition::any().add(
        Expr::expr(Func::lower(Expr::col(student::Column::Major)))
            .eq(professor.department.trim().to_lowercase()),
    );
    if !taught.is_empty() {
        scope = scope.add(student::Column::Id.is_in(taught));
    }

    let mut query = Student::find().filter(scope);
    if let Some(major) = &filter.major {
        query = query.filter(student::Column::Major.eq(major.as_str()));
    }
    if let Some(year_level) = &filter.year_level {
        query = query.filter(student::Column::YearLevel.eq(year_level.as_str()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(student::Column::FirstName.contains(search))
                .add(student::Column::LastName.contains(search))
                .add(student::Column::StudentId.contains(search)),
        );
    }

    let rows = query
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .find_also_related(User)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(student, user)| DirectoryEntry {
            student,
            email: user.map(|u| u.email),
        })
        .collect())
}

/// One student's profile, if visible to the professor.
pub async fn get_student(db: &DatabaseConnection, actor: &Actor, student_id: i64) -> Result<DirectoryEntry> {
    authorize(db, actor, Capability::ProfessorDepartment(student_id)).await?;
    let (student, user) = Student::find_by_id(student_id)
        .find_also_related(User)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;
    Ok(DirectoryEntry {
        student,
        email: user.map(|u| u.email),
    })
}

/// The student's records from the professor's own courses.
pub async fn student_records(db: &DatabaseConnection, actor: &Actor, student_id: i64) -> Result<Vec<GradeHistoryEntry>> {
    authorize(db, actor, Capability::ProfessorTeaches(student_id)).await?;
    records::records_in_professor_courses(db, actor.professor()?, student_id).await
}

/// GPA summary of a taught student over the professor's own courses.
pub async fn student_gpa(
    db: &DatabaseConnection,
    config: &AppConfig,
    actor: &Actor,
    student_id: i64,
) -> Result<GpaSummary> {
    authorize(db, actor, Capability::ProfessorTeaches(student_id)).await?;
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;
    records::gpa_summary_in_professor_courses(db, config, actor.professor()?, &student).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        accounts::{StudentProfileUpdate, update_student_profile},
        grades::{GradeSubmission, LetterGrade},
        records::grade_student,
    };
    use crate::test_utils::{
        create_test_course, create_test_professor, create_test_student, enroll_test_student, setup_test_db,
        test_config,
    };

    #[tokio::test]
    async fn test_directory_scope() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "Mathematics").await?;
        let (_, taught) = create_test_student(&db, "a@example.edu", "STU001").await?;
        let (_, math_major) = create_test_student(&db, "b@example.edu", "STU002").await?;
        create_test_student(&db, "c@example.edu", "STU003").await?;
        update_student_profile(
            &db,
            &math_major,
            StudentProfileUpdate {
                major: Some("mathematics".to_string()),
                ..Default::default()
            },
        )
        .await?;
        let course = create_test_course(&db, &professor, "MATH101").await?;
        enroll_test_student(&db, &taught, &course).await?;

        let listed = list_students(&db, &professor, &DirectoryFilter::default()).await?;
        let numbers: Vec<&str> = listed.iter().map(|e| e.student.student_id.as_str()).collect();
        assert_eq!(numbers, vec!["STU001", "STU002"]);
        assert_eq!(listed[0].email.as_deref(), Some("a@example.edu"));

        let filtered = list_students(
            &db,
            &professor,
            &DirectoryFilter {
                search: Some("STU002".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(filtered.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_records_limited_to_own_courses() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (prof_user, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "Physics").await?;
        let (_, colleague) = create_test_professor(&db, "q@example.edu", "PROF002", "Chemistry").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let (_, stranger) = create_test_student(&db, "t@example.edu", "STU002").await?;
        let mine = create_test_course(&db, &professor, "PHYS101").await?;
        let theirs = create_test_course(&db, &colleague, "CHEM101").await?;
        enroll_test_student(&db, &student, &mine).await?;
        enroll_test_student(&db, &student, &theirs).await?;
        let a = GradeSubmission {
            letter_grade: Some(LetterGrade::A),
            ..Default::default()
        };
        let c = GradeSubmission {
            letter_grade: Some(LetterGrade::C),
            ..Default::default()
        };
        grade_student(&db, &config, &professor, mine.id, student.id, a).await?;
        grade_student(&db, &config, &colleague, theirs.id, student.id, c).await?;

        let actor = Actor::Professor {
            user: prof_user,
            professor,
        };
        let records = student_records(&db, &actor, student.id).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course_code, "PHYS101");

        let gpa = student_gpa(&db, &config, &actor, student.id).await?;
        assert_eq!(gpa.cumulative_gpa, 4.0);
        assert_eq!(gpa.total_credits_attempted, 3);
        assert_eq!(gpa.grade_distribution.get("C"), None);

        let profile = get_student(&db, &actor, student.id).await?;
        assert_eq!(profile.student.id, student.id);

        let hidden = get_student(&db, &actor, stranger.id).await;
        assert!(matches!(hidden, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_department_major_without_enrollment_cannot_see_grades() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (prof_user, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "Mathematics").await?;
        let (_, art_professor) = create_test_professor(&db, "q@example.edu", "PROF002", "Art").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let student = update_student_profile(
            &db,
            &student,
            StudentProfileUpdate {
                major: Some("Mathematics".to_string()),
                ..Default::default()
            },
        )
        .await?;
        let art = create_test_course(&db, &art_professor, "ART101").await?;
        enroll_test_student(&db, &student, &art).await?;
        let d = GradeSubmission {
            letter_grade: Some(LetterGrade::D),
            ..Default::default()
        };
        grade_student(&db, &config, &art_professor, art.id, student.id, d).await?;

        let actor = Actor::Professor {
            user: prof_user,
            professor,
        };
        // Listed and viewable through the department
        let profile = get_student(&db, &actor, student.id).await?;
        assert_eq!(profile.student.id, student.id);

        let gpa = student_gpa(&db, &config, &actor, student.id).await;
        assert!(matches!(gpa, Err(Error::Forbidden { .. })));
        let records = student_records(&db, &actor, student.id).await;
        assert!(matches!(records, Err(Error::Forbidden { .. })));
        Ok(())
    }
}
