//! Attendance business logic - Session marks and attendance reports.
//!
//! One row exists per (student, course, date); recording the same session
//! again overwrites the earlier mark.

use crate::{
    config::settings::AppConfig,
    core::access::owned_course,
    entities::{
        Attendance, AttendanceStatus, Enrollment, EnrollmentStatus, Student, attendance, enrollment,
        professor, student,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A single attendance mark
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceEntry {
    /// Student profile id
    pub student_id: i64,
    /// Course the session belongs to
    pub course_id: i64,
    /// Session date
    pub attendance_date: NaiveDate,
    /// Mark to record
    pub status: AttendanceStatus,
    /// Minutes late, defaults to 0
    #[serde(default)]
    pub late_minutes: i32,
    /// Optional remark
    pub notes: Option<String>,
}

/// One student's mark within a bulk submission
#[derive(Debug, Clone, Deserialize)]
pub struct BulkMark {
    /// Student profile id
    pub student_id: i64,
    /// Mark to record
    pub status: AttendanceStatus,
    /// Minutes late, defaults to 0
    #[serde(default)]
    pub late_minutes: i32,
    /// Optional remark
    pub notes: Option<String>,
}

/// Marks for a whole class session
#[derive(Debug, Clone, Deserialize)]
pub struct BulkAttendance {
    /// Course the session belongs to
    pub course_id: i64,
    /// Session date
    pub attendance_date: NaiveDate,
    /// One mark per student
    pub records: Vec<BulkMark>,
}

/// Counts per status for one student in one course
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    /// Student profile id
    pub student_id: i64,
    /// Course summarised
    pub course_id: i64,
    /// Sessions with a mark
    pub total_sessions: u32,
    /// Present marks
    pub present: u32,
    /// Absent marks
    pub absent: u32,
    /// Late marks
    pub late: u32,
    /// Excused marks
    pub excused: u32,
    /// Tardy marks
    pub tardy: u32,
    /// (present + excused) / total × 100
    pub attendance_percentage: f64,
}

/// A student's line in a course report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAttendance {
    /// Institutional student number
    pub student_number: String,
    /// "First Last"
    pub student_name: String,
    /// Counts for this student
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

/// Attendance of every enrolled student in a course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceReport {
    /// Course reported on
    pub course_id: i64,
    /// Catalog code
    pub course_code: String,
    /// Mean attendance percentage over enrolled students
    pub average_attendance: f64,
    /// Percentage below which a student is at risk
    pub at_risk_threshold: f64,
    /// Every actively enrolled student
    pub students: Vec<StudentAttendance>,
    /// Students below the threshold
    pub at_risk: Vec<StudentAttendance>,
}

/// Tallies marks into a summary.
#[must_use]
pub fn summarize_attendance(student_id: i64, course_id: i64, marks: &[attendance::Model]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        student_id,
        course_id,
        ..Default::default()
    };
    for mark in marks {
        summary.total_sessions += 1;
        match mark.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Excused => summary.excused += 1,
            AttendanceStatus::Tardy => summary.tardy += 1,
        }
    }
    if summary.total_sessions > 0 {
        let attended = f64::from(summary.present + summary.excused);
        let percentage = attended / f64::from(summary.total_sessions) * 100.0;
        summary.attendance_percentage = (percentage * 100.0).round() / 100.0;
    }
    summary
}

async fn ensure_enrolled<C>(db: &C, student_id: i64, course_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let enrolled = Enrollment::find_by_id((student_id, course_id))
        .one(db)
        .await?
        .is_some_and(|e| e.status == EnrollmentStatus::Active);
    if enrolled {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Student {student_id} is not enrolled in course {course_id}"
        )))
    }
}

async fn upsert_mark<C>(db: &C, professor_id: i64, entry: AttendanceEntry) -> Result<attendance::Model>
where
    C: ConnectionTrait,
{
    if entry.late_minutes < 0 {
        return Err(Error::validation("Late minutes cannot be negative"));
    }
    ensure_enrolled(db, entry.student_id, entry.course_id).await?;

    let existing = Attendance::find()
        .filter(attendance::Column::StudentId.eq(entry.student_id))
        .filter(attendance::Column::CourseId.eq(entry.course_id))
        .filter(attendance::Column::AttendanceDate.eq(entry.attendance_date))
        .one(db)
        .await?;

    let is_new = existing.is_none();
    let mut active: attendance::ActiveModel = match existing {
        Some(mark) => mark.into(),
        None => attendance::ActiveModel {
            student_id: Set(entry.student_id),
            course_id: Set(entry.course_id),
            attendance_date: Set(entry.attendance_date),
            ..Default::default()
        },
    };
    active.status = Set(entry.status);
    active.late_minutes = Set(entry.late_minutes);
    active.notes = Set(entry.notes);
    active.recorded_by = Set(professor_id);
    active.recorded_at = Set(Utc::now());
    let mark = if is_new {
        active.insert(db).await?
    } else {
        active.update(db).await?
    };
    Ok(mark)
}

/// Records one mark in a course the professor owns.
#[instrument(skip(db, professor, entry), fields(professor_id = professor.id, course_id = entry.course_id))]
pub async fn record_attendance(
    db: &DatabaseConnection,
    professor: &professor::Model,
    entry: AttendanceEntry,
) -> Result<attendance::Model> {
    owned_course(db, professor, entry.course_id).await?;
    upsert_mark(db, professor.id, entry).await
}

/// Records a whole session at once; any invalid mark rejects the batch.
#[instrument(skip(db, professor, bulk), fields(professor_id = professor.id, course_id = bulk.course_id))]
pub async fn record_bulk_attendance(
    db: &DatabaseConnection,
    professor: &professor::Model,
    bulk: BulkAttendance,
) -> Result<Vec<attendance::Model>> {
    let txn = db.begin().await?;
    owned_course(&txn, professor, bulk.course_id).await?;

    let mut saved = Vec::with_capacity(bulk.records.len());
    for mark in bulk.records {
        let entry = AttendanceEntry {
            student_id: mark.student_id,
            course_id: bulk.course_id,
            attendance_date: bulk.attendance_date,
            status: mark.status,
            late_minutes: mark.late_minutes,
            notes: mark.notes,
        };
        saved.push(upsert_mark(&txn, professor.id, entry).await?);
    }

    txn.commit().await?;
    info!(count = saved.len(), "Recorded attendance for {}", bulk.attendance_date);
    Ok(saved)
}

/// Lists marks in a course the professor owns, optionally for one date.
pub async fn course_attendance(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
    date: Option<NaiveDate>,
) -> Result<Vec<attendance::Model>> {
    owned_course(db, professor, course_id).await?;
    let mut query = Attendance::find().filter(attendance::Column::CourseId.eq(course_id));
    if let Some(date) = date {
        query = query.filter(attendance::Column::AttendanceDate.eq(date));
    }
    query
        .order_by_desc(attendance::Column::AttendanceDate)
        .order_by_asc(attendance::Column::StudentId)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn marks_for<C>(db: &C, student_id: i64, course_id: i64) -> Result<Vec<attendance::Model>>
where
    C: ConnectionTrait,
{
    Attendance::find()
        .filter(attendance::Column::StudentId.eq(student_id))
        .filter(attendance::Column::CourseId.eq(course_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// The student's own attendance in a course they are or were enrolled in.
pub async fn student_attendance(
    db: &DatabaseConnection,
    student: &student::Model,
    course_id: i64,
) -> Result<AttendanceSummary> {
    Enrollment::find_by_id((student.id, course_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Enrollment", format!("student {} in course {course_id}", student.id)))?;
    let marks = marks_for(db, student.id, course_id).await?;
    Ok(summarize_attendance(student.id, course_id, &marks))
}

/// Attendance of every actively enrolled student, flagging those below the
/// configured threshold.
pub async fn course_report(
    db: &DatabaseConnection,
    config: &AppConfig,
    professor: &professor::Model,
    course_id: i64,
) -> Result<AttendanceReport> {
    let course = owned_course(db, professor, course_id).await?;
    let enrolled = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .find_also_related(Student)
        .all(db)
        .await?;

    let mut students = Vec::with_capacity(enrolled.len());
    for student in enrolled.into_iter().filter_map(|(_, student)| student) {
        let marks = marks_for(db, student.id, course_id).await?;
        students.push(StudentAttendance {
            student_name: student.full_name(),
            summary: summarize_attendance(student.id, course_id, &marks),
            student_number: student.student_id,
        });
    }
    students.sort_by(|a, b| a.student_number.cmp(&b.student_number));

    let average_attendance = if students.is_empty() {
        0.0
    } else {
        let total: f64 = students.iter().map(|s| s.summary.attendance_percentage).sum();
        (total / students.len() as f64 * 100.0).round() / 100.0
    };
    let threshold = config.attendance.at_risk_threshold;
    let at_risk = students
        .iter()
        .filter(|s| s.summary.total_sessions > 0 && s.summary.attendance_percentage < threshold)
        .cloned()
        .collect();

    Ok(AttendanceReport {
        course_id,
        course_code: course.course_code,
        average_attendance,
        at_risk_threshold: threshold,
        students,
        at_risk,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{
        create_test_course, create_test_professor, create_test_student, enroll_test_student, setup_test_db,
        test_config,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn mark(student_id: i64, status: AttendanceStatus) -> BulkMark {
        BulkMark {
            student_id,
            status,
            late_minutes: 0,
            notes: None,
        }
    }

    #[test]
    fn test_summary_percentage() {
        let empty = summarize_attendance(1, 1, &[]);
        assert_eq!(empty.attendance_percentage, 0.0);
        assert_eq!(empty.total_sessions, 0);
    }

    #[tokio::test]
    async fn test_record_and_summarize() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &student, &course).await?;

        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Excused,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
        ];
        for (n, status) in statuses.into_iter().enumerate() {
            record_attendance(
                &db,
                &professor,
                AttendanceEntry {
                    student_id: student.id,
                    course_id: course.id,
                    attendance_date: day(u32::try_from(n).unwrap() + 1),
                    status,
                    late_minutes: if status == AttendanceStatus::Late { 10 } else { 0 },
                    notes: None,
                },
            )
            .await?;
        }

        let summary = student_attendance(&db, &student, course.id).await?;
        assert_eq!(summary.total_sessions, 4);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.excused, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.attendance_percentage, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rerecording_a_session_overwrites() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &student, &course).await?;

        let entry = |status| AttendanceEntry {
            student_id: student.id,
            course_id: course.id,
            attendance_date: day(2),
            status,
            late_minutes: 0,
            notes: None,
        };
        record_attendance(&db, &professor, entry(AttendanceStatus::Absent)).await?;
        record_attendance(&db, &professor, entry(AttendanceStatus::Excused)).await?;

        let marks = course_attendance(&db, &professor, course.id, Some(day(2))).await?;
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].status, AttendanceStatus::Excused);
        Ok(())
    }

    #[tokio::test]
    async fn test_attendance_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, other) = create_test_professor(&db, "q@example.edu", "PROF002", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let (_, outsider) = create_test_student(&db, "t@example.edu", "STU002").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &student, &course).await?;

        let entry = |student_id, late_minutes| AttendanceEntry {
            student_id,
            course_id: course.id,
            attendance_date: day(3),
            status: AttendanceStatus::Late,
            late_minutes,
            notes: None,
        };

        let negative = record_attendance(&db, &professor, entry(student.id, -5)).await;
        assert!(matches!(negative, Err(Error::Validation { .. })));

        let not_enrolled = record_attendance(&db, &professor, entry(outsider.id, 0)).await;
        assert!(matches!(not_enrolled, Err(Error::Validation { .. })));

        let not_owner = record_attendance(&db, &other, entry(student.id, 0)).await;
        assert!(matches!(not_owner, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_is_atomic_and_report_flags_risk() -> Result<()> {
        let db = setup_test_db().await?;
        let config = test_config();
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, good) = create_test_student(&db, "a@example.edu", "STU001").await?;
        let (_, poor) = create_test_student(&db, "b@example.edu", "STU002").await?;
        let (_, outsider) = create_test_student(&db, "c@example.edu", "STU003").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &good, &course).await?;
        enroll_test_student(&db, &poor, &course).await?;

        // One bad mark rejects the whole session
        let rejected = record_bulk_attendance(
            &db,
            &professor,
            BulkAttendance {
                course_id: course.id,
                attendance_date: day(1),
                records: vec![
                    mark(good.id, AttendanceStatus::Present),
                    mark(outsider.id, AttendanceStatus::Present),
                ],
            },
        )
        .await;
        assert!(matches!(rejected, Err(Error::Validation { .. })));
        assert!(course_attendance(&db, &professor, course.id, None).await?.is_empty());

        for d in 1..=4 {
            let poor_status = if d == 1 { AttendanceStatus::Present } else { AttendanceStatus::Absent };
            record_bulk_attendance(
                &db,
                &professor,
                BulkAttendance {
                    course_id: course.id,
                    attendance_date: day(d),
                    records: vec![mark(good.id, AttendanceStatus::Present), mark(poor.id, poor_status)],
                },
            )
            .await?;
        }

        let report = course_report(&db, &config, &professor, course.id).await?;
        assert_eq!(report.students.len(), 2);
        assert_eq!(report.students[0].summary.attendance_percentage, 100.0);
        assert_eq!(report.students[1].summary.attendance_percentage, 25.0);
        assert_eq!(report.average_attendance, 62.5);
        assert_eq!(report.at_risk.len(), 1);
        assert_eq!(report.at_risk[0].student_number, "STU002");
        Ok(())
    }
}
