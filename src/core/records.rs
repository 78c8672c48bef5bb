//! Grade ledger business logic - Grading, record access and GPA reads.
//!
//! The ledger (`academic_records`) is the source of truth. GPA figures are
//! computed from it on every read; the `semester_gpas` and
//! `academic_progress` rows are caches refreshed by [`refresh_caches`] inside
//! the transaction of every ledger write.

use crate::{
    config::settings::AppConfig,
    core::{
        access::{Actor, owned_course},
        enrollment::find_course_record,
        gpa::{self, GpaSummary, GradeStatistics, LedgerEntry, TermGpa},
        grades::GradeSubmission,
        progress::{self, ProgressSummary, refresh_progress},
    },
    entities::{
        AcademicRecord, Course, Enrollment, EnrollmentStatus, GradeStatus, SemesterGpa, Student,
        academic_record, course, enrollment, professor, semester_gpa, student,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Ledger listing filters for students
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    /// Exact term name
    pub semester: Option<String>,
    /// Exact term year
    pub year: Option<i32>,
    /// pending, graded, incomplete or withdrawn
    pub status: Option<String>,
}

/// A ledger row joined with its course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeHistoryEntry {
    /// The ledger row
    #[serde(flatten)]
    pub record: academic_record::Model,
    /// Catalog code
    pub course_code: String,
    /// Display title
    pub course_title: String,
    /// Course department
    pub department: String,
    /// Course credit hours
    pub credits: i32,
}

/// One student's row in a course grade sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSheetEntry {
    /// The ledger row
    #[serde(flatten)]
    pub record: academic_record::Model,
    /// Institutional student number
    pub student_number: String,
    /// "First Last"
    pub student_name: String,
}

/// Grade statistics of one course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseGradeStatistics {
    /// Course reported on
    pub course_id: i64,
    /// Catalog code
    pub course_code: String,
    /// Display title
    pub course_title: String,
    /// Figures over the course ledger
    #[serde(flatten)]
    pub statistics: GradeStatistics,
}

/// Who the academic summary is about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentInfo {
    /// Institutional student number
    pub student_number: String,
    /// "First Last"
    pub name: String,
    /// Declared major
    pub major: Option<String>,
    /// Year level
    pub year_level: Option<String>,
}

/// Record counts by status plus the letter distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordCounts {
    /// Every ledger row
    pub total_courses: u32,
    /// Graded rows
    pub courses_completed: u32,
    /// Incomplete rows
    pub courses_incomplete: u32,
    /// Withdrawn rows
    pub courses_withdrawn: u32,
    /// Rows awaiting a grade
    pub courses_pending: u32,
    /// Counted records per letter
    pub grade_distribution: std::collections::BTreeMap<String, u32>,
}

/// One-stop overview of a student's standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicSummary {
    /// Who the summary is about
    pub student: StudentInfo,
    /// GPA over every counted record
    pub cumulative_gpa: f64,
    /// GPA over major courses
    pub major_gpa: f64,
    /// GPA of the latest term
    pub current_semester_gpa: f64,
    /// Credits earned
    pub total_credits_earned: i32,
    /// Credits attempted
    pub total_credits_attempted: i32,
    /// `None` until the student opens a progress record
    pub progress: Option<ProgressSummary>,
    /// Ledger rows by status
    pub records: RecordCounts,
    /// Courses currently enrolled in
    pub active_enrollments: u64,
    /// Per-term GPA, oldest first
    pub semester_breakdown: Vec<TermGpa>,
}

/// Loads every ledger row of a student joined with its course.
pub async fn load_records_with_courses<C>(
    db: &C,
    student_id: i64,
) -> Result<Vec<(academic_record::Model, course::Model)>>
where
    C: ConnectionTrait,
{
    let rows = AcademicRecord::find()
        .filter(academic_record::Column::StudentId.eq(student_id))
        .order_by_asc(academic_record::Column::Year)
        .order_by_asc(academic_record::Column::Id)
        .find_also_related(Course)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(record, course)| course.map(|course| (record, course)))
        .collect())
}

/// Loads a student's ledger in aggregator form.
pub async fn load_ledger<C>(db: &C, student_id: i64) -> Result<Vec<LedgerEntry>>
where
    C: ConnectionTrait,
{
    let rows = load_records_with_courses(db, student_id).await?;
    Ok(rows
        .iter()
        .map(|(record, course)| LedgerEntry::new(record, course))
        .collect())
}

/// Recomputes the cached GPA row for one term and the student's progress row.
///
/// A term with no counted records has its cache row removed.
pub async fn refresh_caches<C>(
    db: &C,
    config: &AppConfig,
    student_id: i64,
    semester: &str,
    year: i32,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let ledger = load_ledger(db, student_id).await?;
    let existing = SemesterGpa::find()
        .filter(semester_gpa::Column::StudentId.eq(student_id))
        .filter(semester_gpa::Column::Semester.eq(semester))
        .filter(semester_gpa::Column::Year.eq(year))
        .one(db)
        .await?;

    match (gpa::term_gpa(&ledger, semester, year, config.grading), existing) {
        (Some(term), Some(row)) => {
            let mut active: semester_gpa::ActiveModel = row.into();
            active.semester_gpa = Set(term.semester_gpa);
            active.credits_earned = Set(term.credits_earned);
            active.credits_attempted = Set(term.credits_attempted);
            active.quality_points = Set(term.quality_points);
            active.courses_completed = Set(term.courses_completed);
            active.courses_attempted = Set(term.courses_attempted);
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
        }
        (Some(term), None) => {
            semester_gpa::ActiveModel {
                student_id: Set(student_id),
                semester: Set(term.semester),
                year: Set(term.year),
                semester_gpa: Set(term.semester_gpa),
                credits_earned: Set(term.credits_earned),
                credits_attempted: Set(term.credits_attempted),
                quality_points: Set(term.quality_points),
                courses_completed: Set(term.courses_completed),
                courses_attempted: Set(term.courses_attempted),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        (None, Some(row)) => {
            row.delete(db).await?;
        }
        (None, None) => {}
    }

    refresh_progress(db, config, student_id).await?;
    debug!(student_id, semester, year, "Refreshed GPA caches");
    Ok(())
}

/// Records a grade for a student in a course the professor owns.
///
/// Graded records mark the enrollment completed, withdrawals mark it dropped.
///
/// # Errors
/// * [`Error::Forbidden`] for another professor's course
/// * [`Error::Validation`] for inconsistent grade values or a student who
///   never enrolled
#[instrument(skip(db, config, professor, submission), fields(professor_id = professor.id))]
pub async fn grade_student(
    db: &DatabaseConnection,
    config: &AppConfig,
    professor: &professor::Model,
    course_id: i64,
    student_id: i64,
    submission: GradeSubmission,
) -> Result<academic_record::Model> {
    let txn = db.begin().await?;
    let course = owned_course(&txn, professor, course_id).await?;

    let enrollment = Enrollment::find_by_id((student_id, course_id))
        .one(&txn)
        .await?
        .filter(|e| e.status != EnrollmentStatus::Dropped)
        .ok_or_else(|| Error::validation("Student is not enrolled in this course"))?;
    let record = find_course_record(&txn, student_id, &course)
        .await?
        .ok_or_else(|| Error::not_found("Academic record", format!("student {student_id} in course {course_id}")))?;

    let validated = submission.validate(record.credits_attempted)?;
    let now = Utc::now();

    let mut active: academic_record::ActiveModel = record.into();
    active.letter_grade = Set(Some(validated.letter_grade.to_string()));
    active.numeric_grade = Set(validated.numeric_grade);
    active.percentage_grade = Set(validated.percentage_grade);
    active.credits_earned = Set(validated.credits_earned);
    active.status = Set(validated.status);
    active.grade_date = Set(Some(now));
    if submission.professor_notes.is_some() {
        active.professor_notes = Set(submission.professor_notes);
    }
    active.updated_at = Set(now);
    let record = active.update(&txn).await?;

    let enrollment_status = match validated.status {
        GradeStatus::Graded => EnrollmentStatus::Completed,
        GradeStatus::Withdrawn => EnrollmentStatus::Dropped,
        GradeStatus::Pending | GradeStatus::Incomplete => EnrollmentStatus::Active,
    };
    if enrollment.status != enrollment_status {
        let mut active: enrollment::ActiveModel = enrollment.into();
        active.status = Set(enrollment_status);
        active.update(&txn).await?;
    }

    refresh_caches(&txn, config, student_id, &course.semester, course.year).await?;
    txn.commit().await?;

    info!(
        record_id = record.id,
        "Graded student {} in {}: {:?}",
        student_id,
        course.course_code,
        record.letter_grade
    );
    Ok(record)
}

/// Lists every ledger row of a course the professor owns.
pub async fn course_grade_sheet(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
) -> Result<Vec<GradeSheetEntry>> {
    owned_course(db, professor, course_id).await?;
    let rows = AcademicRecord::find()
        .filter(academic_record::Column::CourseId.eq(course_id))
        .find_also_related(Student)
        .all(db)
        .await?;

    let mut sheet: Vec<GradeSheetEntry> = rows
        .into_iter()
        .filter_map(|(record, student)| {
            student.map(|student| GradeSheetEntry {
                record,
                student_name: student.full_name(),
                student_number: student.student_id,
            })
        })
        .collect();
    sheet.sort_by(|a, b| a.student_number.cmp(&b.student_number));
    Ok(sheet)
}

/// Grade statistics for a course the professor owns.
pub async fn course_grade_statistics(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
) -> Result<CourseGradeStatistics> {
    let course = owned_course(db, professor, course_id).await?;
    let rows = AcademicRecord::find()
        .filter(academic_record::Column::CourseId.eq(course_id))
        .all(db)
        .await?;
    debug!(course_id, rows = rows.len(), "Computing grade statistics");
    Ok(CourseGradeStatistics {
        course_id: course.id,
        course_code: course.course_code,
        course_title: course.title,
        statistics: gpa::grade_statistics(&rows),
    })
}

/// Lists the student's own ledger rows, newest first.
pub async fn list_student_records(
    db: &DatabaseConnection,
    student: &student::Model,
    filter: &RecordFilter,
) -> Result<Vec<academic_record::Model>> {
    let mut query = AcademicRecord::find().filter(academic_record::Column::StudentId.eq(student.id));
    if let Some(semester) = &filter.semester {
        query = query.filter(academic_record::Column::Semester.eq(semester.as_str()));
    }
    if let Some(year) = filter.year {
        query = query.filter(academic_record::Column::Year.eq(year));
    }
    if let Some(status) = &filter.status {
        query = query.filter(academic_record::Column::Status.eq(parse_status(status)?));
    }
    query
        .order_by_desc(academic_record::Column::Year)
        .order_by_asc(academic_record::Column::Semester)
        .order_by_asc(academic_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn parse_status(value: &str) -> Result<GradeStatus> {
    match value.trim().to_lowercase().as_str() {
        "pending" => Ok(GradeStatus::Pending),
        "graded" => Ok(GradeStatus::Graded),
        "incomplete" => Ok(GradeStatus::Incomplete),
        "withdrawn" => Ok(GradeStatus::Withdrawn),
        other => Err(Error::validation(format!("Unknown grade status: {other}"))),
    }
}

/// Fetches one ledger row the actor may see.
///
/// Students see their own rows; professors see rows of courses they own.
pub async fn get_record(db: &DatabaseConnection, actor: &Actor, record_id: i64) -> Result<academic_record::Model> {
    let record = AcademicRecord::find_by_id(record_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Academic record", record_id))?;

    match actor {
        Actor::Student { student, .. } => {
            if record.student_id != student.id {
                return Err(Error::forbidden("You can only view your own records"));
            }
        }
        Actor::Professor { professor, .. } => {
            owned_course(db, professor, record.course_id).await?;
        }
    }
    Ok(record)
}

/// Replaces the student's own note on a ledger row. Nothing else is editable.
pub async fn update_student_notes(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    record_id: i64,
    student_notes: Option<String>,
) -> Result<academic_record::Model> {
    let txn = db.begin().await?;
    let record = AcademicRecord::find_by_id(record_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Academic record", record_id))?;
    if record.student_id != student.id {
        return Err(Error::forbidden("You can only update your own records"));
    }

    let (semester, year) = (record.semester.clone(), record.year);
    let mut active: academic_record::ActiveModel = record.into();
    active.student_notes = Set(student_notes);
    active.updated_at = Set(Utc::now());
    let record = active.update(&txn).await?;

    refresh_caches(&txn, config, student.id, &semester, year).await?;
    txn.commit().await?;
    Ok(record)
}

/// Computes the student's GPA summary from the ledger.
pub async fn gpa_summary<C>(db: &C, config: &AppConfig, student: &student::Model) -> Result<GpaSummary>
where
    C: ConnectionTrait,
{
    let ledger = load_ledger(db, student.id).await?;
    Ok(gpa::summarize(&ledger, student.major.as_deref(), config.grading))
}

/// GPA summary over only the records from courses the professor owns.
pub async fn gpa_summary_in_professor_courses(
    db: &DatabaseConnection,
    config: &AppConfig,
    professor: &professor::Model,
    student: &student::Model,
) -> Result<GpaSummary> {
    let ledger: Vec<LedgerEntry> = load_records_with_courses(db, student.id)
        .await?
        .iter()
        .filter(|(_, course)| course.professor_id == professor.id)
        .map(|(record, course)| LedgerEntry::new(record, course))
        .collect();
    Ok(gpa::summarize(&ledger, student.major.as_deref(), config.grading))
}

/// GPA, progress and record counts in one read.
///
/// A student without a progress record gets `progress: None` rather than an
/// error.
pub async fn academic_summary(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
) -> Result<AcademicSummary> {
    let summary = gpa_summary(db, config, student).await?;
    let progress = match progress::progress_summary(db, config, student).await {
        Ok(progress) => Some(progress),
        Err(Error::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    let active_enrollments = Enrollment::find()
        .filter(enrollment::Column::StudentId.eq(student.id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .count(db)
        .await?;

    Ok(AcademicSummary {
        student: StudentInfo {
            student_number: student.student_id.clone(),
            name: student.full_name(),
            major: student.major.clone(),
            year_level: student.year_level.clone(),
        },
        cumulative_gpa: summary.cumulative_gpa,
        major_gpa: summary.major_gpa,
        current_semester_gpa: summary.semester_gpa,
        total_credits_earned: summary.total_credits_earned,
        total_credits_attempted: summary.total_credits_attempted,
        progress,
        records: RecordCounts {
            total_courses: summary.courses_completed
                + summary.courses_incomplete
                + summary.courses_withdrawn
                + summary.courses_pending,
            courses_completed: summary.courses_completed,
            courses_incomplete: summary.courses_incomplete,
            courses_withdrawn: summary.courses_withdrawn,
            courses_pending: summary.courses_pending,
            grade_distribution: summary.grade_distribution,
        },
        active_enrollments,
        semester_breakdown: summary.semester_breakdown,
    })
}

/// Ledger rows with course details in chronological order.
pub async fn grade_history(db: &DatabaseConnection, student: &student::Model) -> Result<Vec<GradeHistoryEntry>> {
    let mut rows = load_records_with_courses(db, student.id).await?;
    rows.sort_by(|(a, _), (b, _)| {
        gpa::compare_terms((&a.semester, a.year), (&b.semester, b.year)).then_with(|| a.id.cmp(&b.id))
    });
    Ok(rows
        .into_iter()
        .map(|(record, course)| GradeHistoryEntry {
            record,
            course_code: course.course_code,
            course_title: course.title,
            department: course.department,
            credits: course.credits,
        })
        .collect())
}

/// Records of a student limited to courses the professor owns.
pub async fn records_in_professor_courses(
    db: &DatabaseConnection,
    professor: &professor::Model,
    student_id: i64,
) -> Result<Vec<GradeHistoryEntry>> {
    let rows = load_records_with_courses(db, student_id).await?;
    Ok(rows
        .into_iter()
        .filter(|(_, course)| course.professor_id == professor.id)
        .map(|(record, course)| GradeHistoryEntry {
            record,
            course_code: course.course_code,
            course_title: course.title,
            department: course.department,
            credits: course.credits,
        })
        .collect())
}
