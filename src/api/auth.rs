//! `/auth` - registration, login and the caller's own account.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, JsonBody},
    },
    core::{
        accounts::{self, ProfessorRegistration, StudentRegistration},
        auth::{AccessToken, issue_token},
    },
    entities::{UserRole, professor, student, user},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Login body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// Change-password body
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    /// Must match the stored hash
    pub current_password: String,
    /// Replacement, at least the configured minimum length
    pub new_password: String,
}

/// Returned after a successful registration
#[derive(Debug, Serialize)]
pub struct Registered {
    /// New user row id
    pub user_id: i64,
    /// New student or professor profile id
    pub profile_id: i64,
    /// Login email
    pub email: String,
    /// Role the user registered as
    pub role: UserRole,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct Message {
    /// Human-readable outcome
    pub message: &'static str,
}

/// Routes nested under `/auth`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register/student", post(register_student))
        .route("/register/professor", post(register_professor))
        .route("/me", get(me))
        .route("/me/student", get(me_student))
        .route("/me/professor", get(me_professor))
        .route("/change-password", post(change_password))
}

async fn login(State(state): State<AppState>, JsonBody(request): JsonBody<LoginRequest>) -> Result<Json<AccessToken>> {
    let user = accounts::authenticate(&state.db, &request.email, &request.password).await?;
    let token = issue_token(&user, &state.jwt_secret, state.config.auth.access_token_expire_minutes)?;
    info!("User {} logged in", user.id);
    Ok(Json(token))
}

async fn register_student(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<StudentRegistration>,
) -> Result<Json<Registered>> {
    let (user, student) = accounts::register_student(&state.db, &state.config.auth, registration).await?;
    Ok(Json(Registered {
        user_id: user.id,
        profile_id: student.id,
        email: user.email,
        role: user.role,
    }))
}

async fn register_professor(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<ProfessorRegistration>,
) -> Result<Json<Registered>> {
    let (user, professor) = accounts::register_professor(&state.db, &state.config.auth, registration).await?;
    Ok(Json(Registered {
        user_id: user.id,
        profile_id: professor.id,
        email: user.email,
        role: user.role,
    }))
}

async fn me(CurrentActor(actor): CurrentActor) -> Json<user::Model> {
    Json(actor.user().clone())
}

async fn me_student(CurrentActor(actor): CurrentActor) -> Result<Json<student::Model>> {
    actor.student().cloned().map(Json)
}

async fn me_professor(CurrentActor(actor): CurrentActor) -> Result<Json<professor::Model>> {
    actor.professor().cloned().map(Json)
}

async fn change_password(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(change): JsonBody<PasswordChange>,
) -> Result<Json<Message>> {
    accounts::change_password(
        &state.db,
        &state.config.auth,
        actor.user(),
        &change.current_password,
        &change.new_password,
    )
    .await?;
    Ok(Json(Message {
        message: "Password updated successfully",
    }))
}
