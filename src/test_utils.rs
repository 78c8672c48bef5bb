//! Shared test utilities for the registrar.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::{AppConfig, AuthConfig},
    core::{
        accounts::{self, ProfessorRegistration, StudentRegistration},
        courses::{self, NewCourse},
        enrollment,
    },
    entities::{CourseCategory, course, professor, student, user},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default configuration; transcripts are not written to disk.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

/// Student registration with password `password123` and a Computer Science major.
#[must_use]
pub fn student_registration(email: &str, student_id: &str) -> StudentRegistration {
    StudentRegistration {
        email: email.to_string(),
        password: "password123".to_string(),
        student_id: student_id.to_string(),
        first_name: "Test".to_string(),
        last_name: format!("Student {student_id}"),
        phone: None,
        major: Some("Computer Science".to_string()),
        year_level: Some("Freshman".to_string()),
    }
}

/// Professor registration with password `password123`.
#[must_use]
pub fn professor_registration(email: &str, professor_id: &str, department: &str) -> ProfessorRegistration {
    ProfessorRegistration {
        email: email.to_string(),
        password: "password123".to_string(),
        professor_id: professor_id.to_string(),
        first_name: "Test".to_string(),
        last_name: format!("Professor {professor_id}"),
        department: department.to_string(),
        title: None,
        specialization: None,
        office_location: None,
    }
}

/// Registers a test student.
pub async fn create_test_student(
    db: &DatabaseConnection,
    email: &str,
    student_id: &str,
) -> Result<(user::Model, student::Model)> {
    accounts::register_student(db, &AuthConfig::default(), student_registration(email, student_id)).await
}

/// Registers a test professor.
pub async fn create_test_professor(
    db: &DatabaseConnection,
    email: &str,
    professor_id: &str,
    department: &str,
) -> Result<(user::Model, professor::Model)> {
    accounts::register_professor(
        db,
        &AuthConfig::default(),
        professor_registration(email, professor_id, department),
    )
    .await
}

/// Course input with sensible defaults.
///
/// # Defaults
/// * credits: 3
/// * department: the professor's
/// * category: core
/// * term: Fall 2024
/// * `max_enrollment`: 30
#[must_use]
pub fn new_course(code: &str) -> NewCourse {
    NewCourse {
        course_code: code.to_string(),
        title: format!("{code} Title"),
        description: None,
        credits: 3,
        department: None,
        category: CourseCategory::Core,
        semester: "Fall".to_string(),
        year: 2024,
        max_enrollment: 30,
    }
}

/// Creates a test course owned by `professor` with [`new_course`] defaults.
pub async fn create_test_course(
    db: &DatabaseConnection,
    professor: &professor::Model,
    code: &str,
) -> Result<course::Model> {
    courses::create_course(db, professor, new_course(code)).await
}

/// Enrolls a student with the default configuration.
pub async fn enroll_test_student(
    db: &DatabaseConnection,
    student: &student::Model,
    course: &course::Model,
) -> Result<crate::entities::enrollment::Model> {
    enrollment::enroll(db, &test_config(), student, course.id).await
}
