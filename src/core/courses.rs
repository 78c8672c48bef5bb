//! Course business logic - Catalog maintenance, listings and statistics.
//!
//! Professors manage the courses they own. Everyone authenticated can browse
//! active courses. A course is never deleted, only deactivated, and only
//! while nobody is actively enrolled.

use crate::{
    core::access::owned_course,
    entities::{
        Course, CourseCategory, Enrollment, EnrollmentStatus, Professor, Student, course, enrollment,
        professor,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Condition, PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Input for a new course
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    /// Catalog code, unique per term
    pub course_code: String,
    /// Display title
    pub title: String,
    /// Catalog description
    pub description: Option<String>,
    /// Credit hours, 1 to 12
    pub credits: i32,
    /// Defaults to the owning professor's department
    pub department: Option<String>,
    /// Requirement bucket, defaults to core
    #[serde(default = "default_category")]
    pub category: CourseCategory,
    /// Term name
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Seat limit, at least 1
    pub max_enrollment: i32,
}

const fn default_category() -> CourseCategory {
    CourseCategory::Core
}

/// Editable course fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New credit hours, 1 to 12
    pub credits: Option<i32>,
    /// New requirement bucket
    pub category: Option<CourseCategory>,
    /// New seat limit, at least 1
    pub max_enrollment: Option<i32>,
    /// `false` deactivates; refused while students are enrolled
    pub is_active: Option<bool>,
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    /// Exact department
    pub department: Option<String>,
    /// Exact term name
    pub semester: Option<String>,
    /// Exact term year
    pub year: Option<i32>,
    /// Matched against course code and title
    pub search: Option<String>,
}

/// A course with its live enrollment count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseListing {
    /// The course row
    #[serde(flatten)]
    pub course: course::Model,
    /// Owning professor, "First Last"
    pub professor_name: Option<String>,
    /// Active enrollments
    pub enrolled_count: u64,
}

/// Seats and year-level mix of one course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentStats {
    /// Course reported on
    pub course_id: i64,
    /// Catalog code
    pub course_code: String,
    /// Display title
    pub title: String,
    /// Active enrollments
    pub total_enrolled: u64,
    /// Seat limit
    pub max_enrollment: i32,
    /// Enrolled over seat limit, as a percentage
    pub enrollment_percentage: f64,
    /// Seats left, never negative
    pub available_seats: i64,
    /// Active enrollments per student year level
    pub year_level_distribution: BTreeMap<String, u64>,
}

/// One course in a teaching load report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseLoad {
    /// Course id
    pub course_id: i64,
    /// Catalog code
    pub course_code: String,
    /// Display title
    pub title: String,
    /// Term name
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Credit hours
    pub credits: i32,
    /// Whether the course is active
    pub is_active: bool,
    /// Active enrollments
    pub enrolled: u64,
}

/// Totals over all courses a professor owns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeachingLoad {
    /// Professor profile id
    pub professor_id: i64,
    /// Every course the professor owns
    pub total_courses: usize,
    /// Courses still active
    pub active_courses: usize,
    /// Credits of active courses
    pub total_credits: i32,
    /// Active enrollments across active courses
    pub total_students: u64,
    /// Per-course breakdown
    pub courses: Vec<CourseLoad>,
}

fn validate_credits(credits: i32) -> Result<()> {
    if !(1..=12).contains(&credits) {
        return Err(Error::validation(format!(
            "Credits must be between 1 and 12, got {credits}"
        )));
    }
    Ok(())
}

fn validate_max_enrollment(max_enrollment: i32) -> Result<()> {
    if max_enrollment < 1 {
        return Err(Error::validation("Maximum enrollment must be at least 1"));
    }
    Ok(())
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Counts active enrollments in a course.
pub async fn active_enrollment_count<C>(db: &C, course_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Creates a course owned by `professor`.
///
/// # Errors
/// [`Error::Conflict`] when the code is already used in the same term.
#[instrument(skip(db, professor, new), fields(professor_id = professor.id, code = %new.course_code))]
pub async fn create_course(
    db: &DatabaseConnection,
    professor: &professor::Model,
    new: NewCourse,
) -> Result<course::Model> {
    let course_code = non_empty("Course code", &new.course_code)?.to_uppercase();
    let title = non_empty("Title", &new.title)?;
    let semester = non_empty("Semester", &new.semester)?;
    validate_credits(new.credits)?;
    validate_max_enrollment(new.max_enrollment)?;
    let department = match new.department {
        Some(department) => non_empty("Department", &department)?,
        None => professor.department.clone(),
    };

    let existing = Course::find()
        .filter(course::Column::CourseCode.eq(&course_code))
        .filter(course::Column::Semester.eq(&semester))
        .filter(course::Column::Year.eq(new.year))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::conflict(format!(
            "Course {course_code} already exists for {semester} {}",
            new.year
        )));
    }

    let course = course::ActiveModel {
        course_code: Set(course_code),
        title: Set(title),
        description: Set(new.description),
        credits: Set(new.credits),
        department: Set(department),
        category: Set(new.category),
        semester: Set(semester),
        year: Set(new.year),
        max_enrollment: Set(new.max_enrollment),
        professor_id: Set(professor.id),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(course_id = course.id, "Created course {}", course.course_code);
    Ok(course)
}

async fn ensure_no_active_enrollments(db: &DatabaseConnection, course_id: i64) -> Result<()> {
    let enrolled = active_enrollment_count(db, course_id).await?;
    if enrolled > 0 {
        return Err(Error::conflict(format!(
            "Cannot deactivate course with {enrolled} enrolled students"
        )));
    }
    Ok(())
}

/// Updates a course the professor owns.
///
/// Capacity cannot drop below the current number of active enrollments, and
/// `is_active: false` is refused while students are enrolled.
pub async fn update_course(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
    update: CourseUpdate,
) -> Result<course::Model> {
    let course = owned_course(db, professor, course_id).await?;
    let mut active: course::ActiveModel = course.into();

    if let Some(title) = update.title {
        active.title = Set(non_empty("Title", &title)?);
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description));
    }
    if let Some(credits) = update.credits {
        validate_credits(credits)?;
        active.credits = Set(credits);
    }
    if let Some(category) = update.category {
        active.category = Set(category);
    }
    if let Some(max_enrollment) = update.max_enrollment {
        validate_max_enrollment(max_enrollment)?;
        let enrolled = active_enrollment_count(db, course_id).await?;
        if u64::try_from(max_enrollment).unwrap_or(0) < enrolled {
            return Err(Error::validation(format!(
                "Maximum enrollment {max_enrollment} is below the {enrolled} students enrolled"
            )));
        }
        active.max_enrollment = Set(max_enrollment);
    }
    if let Some(is_active) = update.is_active {
        if !is_active {
            ensure_no_active_enrollments(db, course_id).await?;
        }
        active.is_active = Set(is_active);
    }

    active.update(db).await.map_err(Into::into)
}

/// Marks a course inactive.
///
/// # Errors
/// [`Error::Conflict`] while any student is actively enrolled.
pub async fn deactivate_course(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
) -> Result<course::Model> {
    let course = owned_course(db, professor, course_id).await?;
    ensure_no_active_enrollments(db, course_id).await?;

    let mut active: course::ActiveModel = course.into();
    active.is_active = Set(false);
    let course = active.update(db).await?;
    info!(course_id, "Deactivated course");
    Ok(course)
}

async fn with_counts(
    db: &DatabaseConnection,
    rows: Vec<(course::Model, Option<professor::Model>)>,
) -> Result<Vec<CourseListing>> {
    let mut listings = Vec::with_capacity(rows.len());
    for (course, professor) in rows {
        let enrolled_count = active_enrollment_count(db, course.id).await?;
        listings.push(CourseListing {
            course,
            professor_name: professor.map(|p| format!("{} {}", p.first_name, p.last_name)),
            enrolled_count,
        });
    }
    Ok(listings)
}

/// Lists active courses matching `filter`, ordered by code.
pub async fn list_active_courses(db: &DatabaseConnection, filter: &CourseFilter) -> Result<Vec<CourseListing>> {
    let mut query = Course::find().filter(course::Column::IsActive.eq(true));
    if let Some(department) = &filter.department {
        query = query.filter(course::Column::Department.eq(department.as_str()));
    }
    if let Some(semester) = &filter.semester {
        query = query.filter(course::Column::Semester.eq(semester.as_str()));
    }
    if let Some(year) = filter.year {
        query = query.filter(course::Column::Year.eq(year));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(course::Column::CourseCode.contains(search))
                .add(course::Column::Title.contains(search)),
        );
    }

    let rows = query
        .order_by_asc(course::Column::CourseCode)
        .find_also_related(Professor)
        .all(db)
        .await?;
    with_counts(db, rows).await
}

/// Fetches one course with its enrollment count.
pub async fn get_course(db: &DatabaseConnection, course_id: i64) -> Result<CourseListing> {
    let row = Course::find_by_id(course_id)
        .find_also_related(Professor)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;
    let mut listings = with_counts(db, vec![row]).await?;
    listings
        .pop()
        .ok_or_else(|| Error::not_found("Course", course_id))
}

/// Lists every course the professor owns, newest term first.
pub async fn list_professor_courses(
    db: &DatabaseConnection,
    professor: &professor::Model,
) -> Result<Vec<CourseListing>> {
    let courses = Course::find()
        .filter(course::Column::ProfessorId.eq(professor.id))
        .order_by_desc(course::Column::Year)
        .order_by_asc(course::Column::CourseCode)
        .all(db)
        .await?;
    let rows = courses
        .into_iter()
        .map(|course| (course, Some(professor.clone())))
        .collect();
    with_counts(db, rows).await
}

/// Enrollment figures for a course the professor owns.
pub async fn enrollment_stats(
    db: &DatabaseConnection,
    professor: &professor::Model,
    course_id: i64,
) -> Result<EnrollmentStats> {
    let course = owned_course(db, professor, course_id).await?;
    let students = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
        .find_also_related(Student)
        .all(db)
        .await?;

    let mut year_level_distribution = BTreeMap::new();
    for (_, student) in &students {
        let level = student
            .as_ref()
            .and_then(|s| s.year_level.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        *year_level_distribution.entry(level).or_insert(0) += 1;
    }

    let total_enrolled = students.len() as u64;
    let enrollment_percentage = if course.max_enrollment > 0 {
        let ratio = total_enrolled as f64 / f64::from(course.max_enrollment) * 100.0;
        (ratio * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(EnrollmentStats {
        course_id: course.id,
        course_code: course.course_code,
        title: course.title,
        total_enrolled,
        max_enrollment: course.max_enrollment,
        enrollment_percentage,
        available_seats: (i64::from(course.max_enrollment) - total_enrolled as i64).max(0),
        year_level_distribution,
    })
}

/// Summarizes the professor's courses and active enrollments.
pub async fn teaching_load(db: &DatabaseConnection, professor: &professor::Model) -> Result<TeachingLoad> {
    let listings = list_professor_courses(db, professor).await?;

    let courses: Vec<CourseLoad> = listings
        .into_iter()
        .map(|listing| CourseLoad {
            course_id: listing.course.id,
            course_code: listing.course.course_code,
            title: listing.course.title,
            semester: listing.course.semester,
            year: listing.course.year,
            credits: listing.course.credits,
            is_active: listing.course.is_active,
            enrolled: listing.enrolled_count,
        })
        .collect();
    let active: Vec<&CourseLoad> = courses.iter().filter(|c| c.is_active).collect();

    Ok(TeachingLoad {
        professor_id: professor.id,
        total_courses: courses.len(),
        active_courses: active.len(),
        total_credits: active.iter().map(|c| c.credits).sum(),
        total_students: active.iter().map(|c| c.enrolled).sum(),
        courses,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{
        create_test_course, create_test_professor, create_test_student, enroll_test_student, new_course,
        setup_test_db,
    };

    #[tokio::test]
    async fn test_create_course() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;

        let course = create_course(&db, &professor, new_course("cs101")).await?;
        assert_eq!(course.course_code, "CS101");
        assert_eq!(course.department, "CS");
        assert_eq!(course.professor_id, professor.id);
        assert!(course.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_code_in_term_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        create_test_course(&db, &professor, "CS101").await?;

        let result = create_course(&db, &professor, new_course("CS101")).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        // Same code in another term is fine
        let mut spring = new_course("CS101");
        spring.semester = "Spring".to_string();
        spring.year = 2025;
        create_course(&db, &professor, spring).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_course_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;

        let mut zero_credits = new_course("CS101");
        zero_credits.credits = 0;
        let result = create_course(&db, &professor, zero_credits).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut no_seats = new_course("CS102");
        no_seats.max_enrollment = 0;
        let result = create_course(&db, &professor, no_seats).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_requires_ownership() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, owner) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, other) = create_test_professor(&db, "q@example.edu", "PROF002", "CS").await?;
        let course = create_test_course(&db, &owner, "CS101").await?;

        let update = CourseUpdate {
            title: Some("Intro to Programming".to_string()),
            ..Default::default()
        };
        let result = update_course(&db, &other, course.id, update.clone()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let updated = update_course(&db, &owner, course.id, update).await?;
        assert_eq!(updated.title, "Intro to Programming");
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_blocked_by_enrollment() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        let empty = create_test_course(&db, &professor, "CS102").await?;
        enroll_test_student(&db, &student, &course).await?;

        let result = deactivate_course(&db, &professor, course.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let deactivated = deactivate_course(&db, &professor, empty.id).await?;
        assert!(!deactivated.is_active);

        let listed = list_active_courses(&db, &CourseFilter::default()).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].enrolled_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_cannot_deactivate_enrolled_course() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, student) = create_test_student(&db, "s@example.edu", "STU001").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        enroll_test_student(&db, &student, &course).await?;

        let deactivate = CourseUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let result = update_course(&db, &professor, course.id, deactivate.clone()).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(get_course(&db, course.id).await?.course.is_active);

        let empty = create_test_course(&db, &professor, "CS102").await?;
        let updated = update_course(&db, &professor, empty.id, deactivate).await?;
        assert!(!updated.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, cs) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let (_, math) = create_test_professor(&db, "q@example.edu", "PROF002", "MATH").await?;
        create_test_course(&db, &cs, "CS101").await?;
        create_test_course(&db, &cs, "CS201").await?;
        create_test_course(&db, &math, "MATH101").await?;

        let filter = CourseFilter {
            department: Some("CS".to_string()),
            ..Default::default()
        };
        assert_eq!(list_active_courses(&db, &filter).await?.len(), 2);

        let filter = CourseFilter {
            search: Some("201".to_string()),
            ..Default::default()
        };
        let found = list_active_courses(&db, &filter).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].course.course_code, "CS201");
        assert_eq!(found[0].professor_name.as_deref(), Some("Test Professor PROF001"));

        let missing = get_course(&db, 999).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_and_teaching_load() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, professor) = create_test_professor(&db, "p@example.edu", "PROF001", "CS").await?;
        let course = create_test_course(&db, &professor, "CS101").await?;
        create_test_course(&db, &professor, "CS102").await?;
        for n in 1..=3 {
            let (_, student) = create_test_student(&db, &format!("s{n}@example.edu"), &format!("STU00{n}")).await?;
            enroll_test_student(&db, &student, &course).await?;
        }

        let stats = enrollment_stats(&db, &professor, course.id).await?;
        assert_eq!(stats.total_enrolled, 3);
        assert_eq!(stats.available_seats, 27);
        assert_eq!(stats.enrollment_percentage, 10.0);
        assert_eq!(stats.year_level_distribution.get("Freshman"), Some(&3));

        let load = teaching_load(&db, &professor).await?;
        assert_eq!(load.total_courses, 2);
        assert_eq!(load.active_courses, 2);
        assert_eq!(load.total_credits, 6);
        assert_eq!(load.total_students, 3);
        Ok(())
    }
}
