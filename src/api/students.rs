//! `/students` - the student's own profile and enrollments.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, JsonBody},
    },
    core::{
        accounts::{self, StudentProfileUpdate},
        enrollment::{self, EnrolledCourse},
    },
    entities::{enrollment as enrollment_entity, student},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use serde::Deserialize;

/// Enrollment body
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    /// Course to enroll in
    pub course_id: i64,
}

/// Routes nested under `/students`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/courses/enroll", post(enroll))
        .route("/courses/enrolled", get(enrolled))
        .route("/courses/:course_id/withdraw", delete(withdraw))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(update): JsonBody<StudentProfileUpdate>,
) -> Result<Json<student::Model>> {
    accounts::update_student_profile(&state.db, actor.student()?, update)
        .await
        .map(Json)
}

async fn enroll(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<EnrollRequest>,
) -> Result<Json<enrollment_entity::Model>> {
    enrollment::enroll(&state.db, &state.config, actor.student()?, request.course_id)
        .await
        .map(Json)
}

async fn enrolled(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> Result<Json<Vec<EnrolledCourse>>> {
    enrollment::list_enrolled(&state.db, actor.student()?).await.map(Json)
}

async fn withdraw(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<i64>,
) -> Result<Json<enrollment_entity::Model>> {
    enrollment::withdraw(&state.db, &state.config, actor.student()?, course_id)
        .await
        .map(Json)
}
