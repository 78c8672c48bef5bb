//! Account business logic - Registration, login and profile maintenance.
//!
//! A user row and its role profile are always written together in one
//! transaction. Uniqueness of email and institutional identifiers is checked
//! up front for a readable error and enforced again by the unique columns.

use crate::{
    config::settings::AuthConfig,
    core::auth::{hash_password, verify_password},
    entities::{Professor, Student, User, UserRole, professor, student, user},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Input for student self-registration
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRegistration {
    /// Login email; unique across users
    pub email: String,
    /// Plain-text password, at least the configured minimum length
    pub password: String,
    /// Institutional student number; unique
    pub student_id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Declared major
    pub major: Option<String>,
    /// Freshman, Sophomore, Junior or Senior
    pub year_level: Option<String>,
}

/// Input for professor registration
#[derive(Debug, Clone, Deserialize)]
pub struct ProfessorRegistration {
    /// Login email; unique across users
    pub email: String,
    /// Plain-text password, at least the configured minimum length
    pub password: String,
    /// Institutional staff number; unique
    pub professor_id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Home department
    pub department: String,
    /// Academic title
    pub title: Option<String>,
    /// Research or teaching area
    pub specialization: Option<String>,
    /// Office room
    pub office_location: Option<String>,
}

/// Editable student profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentProfileUpdate {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// New declared major
    pub major: Option<String>,
    /// New year level
    pub year_level: Option<String>,
    /// Chosen graduation date
    pub graduation_date: Option<NaiveDate>,
}

/// Editable professor profile fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessorProfileUpdate {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New department
    pub department: Option<String>,
    /// New academic title
    pub title: Option<String>,
    /// New specialization
    pub specialization: Option<String>,
    /// New office room
    pub office_location: Option<String>,
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(Error::validation(format!("Invalid email address: {email}")))
    }
}

fn validate_password(password: &str, config: &AuthConfig) -> Result<()> {
    if password.chars().count() < config.min_password_length {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            config.min_password_length
        )));
    }
    Ok(())
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

async fn ensure_email_free<C>(db: &C, email: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::conflict("Email already registered"));
    }
    Ok(())
}

async fn insert_user<C>(db: &C, email: String, password_hash: String, role: UserRole) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let user = user::ActiveModel {
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Registers a student user and profile.
///
/// # Errors
/// [`Error::Conflict`] for a taken email or student id, [`Error::Validation`]
/// for malformed input.
#[instrument(skip(db, config, registration), fields(email = %registration.email))]
pub async fn register_student(
    db: &DatabaseConnection,
    config: &AuthConfig,
    registration: StudentRegistration,
) -> Result<(user::Model, student::Model)> {
    let email = validate_email(&registration.email)?;
    validate_password(&registration.password, config)?;
    let student_number = required("Student ID", &registration.student_id)?;
    let first_name = required("First name", &registration.first_name)?;
    let last_name = required("Last name", &registration.last_name)?;
    let password_hash = hash_password(&registration.password)?;

    let txn = db.begin().await?;

    ensure_email_free(&txn, &email).await?;
    let taken = Student::find()
        .filter(student::Column::StudentId.eq(&student_number))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(Error::conflict("Student ID already exists"));
    }

    let user = insert_user(&txn, email, password_hash, UserRole::Student).await?;
    let student = student::ActiveModel {
        user_id: Set(user.id),
        student_id: Set(student_number),
        first_name: Set(first_name),
        last_name: Set(last_name),
        phone: Set(registration.phone),
        major: Set(registration.major),
        year_level: Set(registration.year_level),
        enrollment_date: Set(Utc::now()),
        graduation_date: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id = user.id, "Registered student {}", student.student_id);
    Ok((user, student))
}

/// Registers a professor user and profile.
///
/// # Errors
/// [`Error::Conflict`] for a taken email or professor id, [`Error::Validation`]
/// for malformed input.
#[instrument(skip(db, config, registration), fields(email = %registration.email))]
pub async fn register_professor(
    db: &DatabaseConnection,
    config: &AuthConfig,
    registration: ProfessorRegistration,
) -> Result<(user::Model, professor::Model)> {
    let email = validate_email(&registration.email)?;
    validate_password(&registration.password, config)?;
    let professor_number = required("Professor ID", &registration.professor_id)?;
    let first_name = required("First name", &registration.first_name)?;
    let last_name = required("Last name", &registration.last_name)?;
    let department = required("Department", &registration.department)?;
    let password_hash = hash_password(&registration.password)?;

    let txn = db.begin().await?;

    ensure_email_free(&txn, &email).await?;
    let taken = Professor::find()
        .filter(professor::Column::ProfessorId.eq(&professor_number))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(Error::conflict("Professor ID already exists"));
    }

    let user = insert_user(&txn, email, password_hash, UserRole::Professor).await?;
    let professor = professor::ActiveModel {
        user_id: Set(user.id),
        professor_id: Set(professor_number),
        first_name: Set(first_name),
        last_name: Set(last_name),
        department: Set(department),
        title: Set(registration.title),
        specialization: Set(registration.specialization),
        office_location: Set(registration.office_location),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id = user.id, "Registered professor {}", professor.professor_id);
    Ok((user, professor))
}

/// Checks login credentials.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
#[instrument(skip(db, password))]
pub async fn authenticate(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model> {
    let email = email.trim().to_lowercase();
    let Some(user) = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
    else {
        warn!("Login attempt for unknown email");
        return Err(Error::unauthenticated("Incorrect email or password"));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(Error::unauthenticated("Incorrect email or password"));
    }
    if !user.is_active {
        return Err(Error::unauthenticated("Inactive user"));
    }
    Ok(user)
}

/// Replaces the password after verifying the current one.
pub async fn change_password(
    db: &DatabaseConnection,
    config: &AuthConfig,
    user: &user::Model,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    if !verify_password(current_password, &user.password_hash)? {
        return Err(Error::validation("Incorrect current password"));
    }
    validate_password(new_password, config)?;

    let mut active: user::ActiveModel = user.clone().into();
    active.password_hash = Set(hash_password(new_password)?);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    info!(user_id = user.id, "Password changed");
    Ok(())
}

fn set_if_some<T>(field: &mut sea_orm::ActiveValue<T>, value: Option<T>)
where
    T: Into<sea_orm::Value>,
{
    if let Some(value) = value {
        *field = Set(value);
    }
}

/// Applies a partial update to a student profile.
pub async fn update_student_profile<C>(
    db: &C,
    student: &student::Model,
    update: StudentProfileUpdate,
) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    let mut active: student::ActiveModel = student.clone().into();
    if let Some(first_name) = update.first_name {
        active.first_name = Set(required("First name", &first_name)?);
    }
    if let Some(last_name) = update.last_name {
        active.last_name = Set(required("Last name", &last_name)?);
    }
    set_if_some(&mut active.phone, update.phone.map(Some));
    set_if_some(&mut active.major, update.major.map(Some));
    set_if_some(&mut active.year_level, update.year_level.map(Some));
    set_if_some(&mut active.graduation_date, update.graduation_date.map(Some));
    active.update(db).await.map_err(Into::into)
}

/// Applies a partial update to a professor profile.
pub async fn update_professor_profile(
    db: &DatabaseConnection,
    professor: &professor::Model,
    update: ProfessorProfileUpdate,
) -> Result<professor::Model> {
    let mut active: professor::ActiveModel = professor.clone().into();
    if let Some(first_name) = update.first_name {
        active.first_name = Set(required("First name", &first_name)?);
    }
    if let Some(last_name) = update.last_name {
        active.last_name = Set(required("Last name", &last_name)?);
    }
    if let Some(department) = update.department {
        active.department = Set(required("Department", &department)?);
    }
    set_if_some(&mut active.title, update.title.map(Some));
    set_if_some(&mut active.specialization, update.specialization.map(Some));
    set_if_some(&mut active.office_location, update.office_location.map(Some));
    active.update(db).await.map_err(Into::into)
}
