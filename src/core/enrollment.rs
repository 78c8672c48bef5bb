//! Enrollment business logic - Joining and leaving courses.
//!
//! Enrollment and the student's ledger row for the course move together:
//! enrolling opens a pending record, dropping turns it into a withdrawal.
//! Both changes and the GPA cache refresh commit in one transaction.

use crate::{
    config::settings::AppConfig,
    core::{access::owned_course, courses::active_enrollment_count, records::refresh_caches},
    entities::{
        AcademicRecord, Course, Enrollment, EnrollmentStatus, GradeStatus, User, academic_record, course,
        enrollment, professor, student,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// A course the student is enrolled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrolledCourse {
    /// The course row
    #[serde(flatten)]
    pub course: course::Model,
    /// Most recent (re-)enrollment time
    pub enrollment_date: DateTime<Utc>,
    /// Active, dropped or completed
    pub enrollment_status: EnrollmentStatus,
}

/// A student on a course roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    /// The student profile
    #[serde(flatten)]
    pub student: student::Model,
    /// Login email of the owning user
    pub email: Option<String>,
    /// Most recent (re-)enrollment time
    pub enrollment_date: DateTime<Utc>,
    /// Active, dropped or completed
    pub enrollment_status: EnrollmentStatus,
}

/// Finds the ledger row for a student in a course's term.
pub async fn find_course_record<C>(
    db: &C,
    student_id: i64,
    course: &course::Model,
) -> Result<Option<academic_record::Model>>
where
    C: ConnectionTrait,
{
    AcademicRecord::find()
        .filter(academic_record::Column::StudentId.eq(student_id))
        .filter(academic_record::Column::CourseId.eq(course.id))
        .filter(academic_record::Column::Semester.eq(course.semester.as_str()))
        .filter(academic_record::Column::Year.eq(course.year))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Opens (or reopens) the pending ledger row for a fresh enrollment.
async fn open_pending_record(
    txn: &DatabaseTransaction,
    student_id: i64,
    course: &course::Model,
) -> Result<academic_record::Model> {
    let now = Utc::now();
    if let Some(record) = find_course_record(txn, student_id, course).await? {
        let mut active: academic_record::ActiveModel = record.into();
        active.letter_grade = Set(None);
        active.numeric_grade = Set(None);
        active.percentage_grade = Set(None);
        active.credits_earned = Set(0);
        active.credits_attempted = Set(course.credits);
        active.status = Set(GradeStatus::Pending);
        active.grade_date = Set(None);
        active.updated_at = Set(now);
        return active.update(txn).await.map_err(Into::into);
    }

    academic_record::ActiveModel {
        student_id: Set(student_id),
        course_id: Set(course.id),
        semester: Set(course.semester.clone()),
        year: Set(course.year),
        letter_grade: Set(None),
        numeric_grade: Set(None),
        percentage_grade: Set(None),
        credits_earned: Set(0),
        credits_attempted: Set(course.credits),
        status: Set(GradeStatus::Pending),
        grade_date: Set(None),
        professor_notes: Set(None),
        student_notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(Into::into)
}

/// Enrolls a student in an active course with free seats.
///
/// Re-enrolling after a drop reactivates the existing enrollment and resets
/// the withdrawn record to pending.
///
/// # Errors
/// * [`Error::NotFound`] for an unknown course
/// * [`Error::Validation`] for an inactive course
/// * [`Error::Conflict`] when already enrolled, already completed, or full
#[instrument(skip(db, config, student), fields(student_id = student.id))]
pub async fn enroll(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    course_id: i64,
) -> Result<enrollment::Model> {
    let txn = db.begin().await?;

    let course = Course::find_by_id(course_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;
    if !course.is_active {
        return Err(Error::validation(format!(
            "Course {} is not active",
            course.course_code
        )));
    }

    let existing = Enrollment::find_by_id((student.id, course_id)).one(&txn).await?;
    match existing.as_ref().map(|e| e.status) {
        Some(EnrollmentStatus::Active) => {
            return Err(Error::conflict(format!(
                "Already enrolled in {}",
                course.course_code
            )));
        }
        Some(EnrollmentStatus::Completed) => {
            return Err(Error::conflict(format!(
                "Already completed {}",
                course.course_code
            )));
        }
        Some(EnrollmentStatus::Dropped) | None => {}
    }

    let enrolled = active_enrollment_count(&txn, course_id).await?;
    if enrolled >= u64::try_from(course.max_enrollment).unwrap_or(0) {
        return Err(Error::conflict(format!("Course {} is full", course.course_code)));
    }

    let now = Utc::now();
    let enrollment = match existing {
        Some(dropped) => {
            let mut active: enrollment::ActiveModel = dropped.into();
            active.status = Set(EnrollmentStatus::Active);
            active.enrollment_date = Set(now);
            active.update(&txn).await?
        }
        None => {
            enrollment::ActiveModel {
                student_id: Set(student.id),
                course_id: Set(course_id),
                enrollment_date: Set(now),
                status: Set(EnrollmentStatus::Active),
            }
            .insert(&txn)
            .await?
        }
    };

    open_pending_record(&txn, student.id, &course).await?;
    refresh_caches(&txn, config, student.id, &course.semester, course.year).await?;

    txn.commit().await?;
    info!(course_id, "Enrolled student in {}", course.course_code);
    Ok(enrollment)
}

/// Marks an active enrollment dropped and its record withdrawn.
async fn drop_enrollment(
    txn: &DatabaseTransaction,
    config: &AppConfig,
    student_id: i64,
    course: &course::Model,
) -> Result<enrollment::Model> {
    let enrollment = Enrollment::find_by_id((student_id, course.id))
        .one(txn)
        .await?
        .filter(|e| e.status == EnrollmentStatus::Active)
        .ok_or_else(|| Error::not_found("Enrollment", format!("student {student_id} in course {}", course.id)))?;

    let mut active: enrollment::ActiveModel = enrollment.into();
    active.status = Set(EnrollmentStatus::Dropped);
    let enrollment = active.update(txn).await?;

    if let Some(record) = find_course_record(txn, student_id, course).await? {
        let mut active: academic_record::ActiveModel = record.into();
        active.letter_grade = Set(Some("W".to_string()));
        active.numeric_grade = Set(None);
        active.percentage_grade = Set(None);
        active.credits_earned = Set(0);
        active.status = Set(GradeStatus::Withdrawn);
        active.grade_date = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;
    }

    refresh_caches(txn, config, student_id, &course.semester, course.year).await?;
    Ok(enrollment)
}

/// Withdraws the student from a course they are actively enrolled in.
#[instrument(skip(db, config, student), fields(student_id = student.id))]
pub async fn withdraw(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    course_id: i64,
) -> Result<enrollment::Model> {
    let txn = db.begin().await?;
    let course = Course::find_by_id(course_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;
    let enrollment = drop_enrollment(&txn, config, student.id, &course).await?;
    txn.commit().await?;
    info!(course_id, "Student withdrew from {}", course.course_code);
    Ok(enrollment)
}

/// Removes a student from a course the professor owns.
#[instrument(skip(db, config, professor), fields(professor_id = professor.id))]
pub async fn remove_student(
    db: &DatabaseConnection,
    config: &AppConfig,
    professor: &professor::Model,
    course_id: i64,
    student_id: i64,
) -> Result<enrollment::Model> {
    let txn = db.begin().await?;
    let course = owned_course(&txn, professor, course_id).await?;
    let enrollment = drop_enrollment(&txn, config, student_id, &course).await?;
    txn.commit().await?;
    info!(course_id, student_id, "Removed student from {}", course.course_code);
    Ok(enrollment)
}

/// Lists the student's active enrollments with their courses.
pub async fn list_enrolled(db: &DatabaseConnection, student: &student::Model) -> Result<Vec<EnrolledCourse>> {
    let rows = Enrollment::find()
        .filter(enrollment::Column::StudentId.eq(student.id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .order_by_asc(enrollment::Column::EnrollmentDate)
        .find_also_related(Course)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(enrollment, course)| {
            course.map(|course| EnrolledCourse {
                course,
                enrollment_date: enrollment.enrollment_date,
                enrollment_status: enrollment.status,
            })
        })
        .collect())
}

/// Lists students actively enrolled in a course the professor owns.
pub async fn course_roster(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
) -> Result<Vec<RosterEntry>> {
    owned_course(db, professor, course_id).await?;
    let rows = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .find_also_related(crate::entities::Student)
        .all(db)
        .await?;

    let mut roster = Vec::with_capacity(rows.len());
    for (enrollment, student) in rows {
        let Some(student) = student else { continue };
        let email = User::find_by_id(student.user_id).one(db).await?.map(|u| u.email);
        roster.push(RosterEntry {
            student,
            email,
            enrollment_date: enrollment.enrollment_date,
            enrollment_status: enrollment.status,
        });
    }
    roster.sort_by(|a, b| {
        a.student
            .last_name
            .cmp(&b.student.last_name)
            .then_with(|| a.student.first_name.cmp(&b.student.first_name))
    });
    Ok(roster)
}
