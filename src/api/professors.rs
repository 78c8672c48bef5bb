//! `/professors` - course management, rosters and grading.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, JsonBody},
    },
    core::{
        accounts::{self, ProfessorProfileUpdate},
        courses::{self, CourseListing, CourseUpdate, EnrollmentStats, NewCourse, TeachingLoad},
        enrollment::{self, RosterEntry},
        grades::GradeSubmission,
        records::{self, CourseGradeStatistics, GradeSheetEntry},
    },
    entities::{academic_record, course, enrollment as enrollment_entity, professor},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
};

/// Routes nested under `/professors`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/teaching-load", get(teaching_load))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:id", put(update_course).delete(deactivate_course))
        .route("/courses/:id/students", get(roster))
        .route("/courses/:id/students/:student_id", delete(remove_student))
        .route("/courses/:id/enrollment-stats", get(enrollment_stats))
        .route("/courses/:id/grades", get(grade_sheet))
        .route("/courses/:id/grade-stats", get(grade_stats))
        .route("/courses/:id/grades/:student_id", put(grade_student))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(update): JsonBody<ProfessorProfileUpdate>,
) -> Result<Json<professor::Model>> {
    accounts::update_professor_profile(&state.db, actor.professor()?, update)
        .await
        .map(Json)
}

async fn teaching_load(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> Result<Json<TeachingLoad>> {
    courses::teaching_load(&state.db, actor.professor()?).await.map(Json)
}

async fn list_courses(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<CourseListing>>> {
    courses::list_professor_courses(&state.db, actor.professor()?)
        .await
        .map(Json)
}

async fn create_course(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(new): JsonBody<NewCourse>,
) -> Result<(StatusCode, Json<course::Model>)> {
    let course = courses::create_course(&state.db, actor.professor()?, new).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<CourseUpdate>,
) -> Result<Json<course::Model>> {
    courses::update_course(&state.db, actor.professor()?, id, update)
        .await
        .map(Json)
}

async fn deactivate_course(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<course::Model>> {
    courses::deactivate_course(&state.db, actor.professor()?, id)
        .await
        .map(Json)
}

async fn roster(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RosterEntry>>> {
    enrollment::course_roster(&state.db, actor.professor()?, id)
        .await
        .map(Json)
}

async fn remove_student(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<Json<enrollment_entity::Model>> {
    enrollment::remove_student(&state.db, &state.config, actor.professor()?, id, student_id)
        .await
        .map(Json)
}

async fn enrollment_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<EnrollmentStats>> {
    courses::enrollment_stats(&state.db, actor.professor()?, id)
        .await
        .map(Json)
}

async fn grade_sheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GradeSheetEntry>>> {
    records::course_grade_sheet(&state.db, actor.professor()?, id)
        .await
        .map(Json)
}

async fn grade_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<CourseGradeStatistics>> {
    records::course_grade_statistics(&state.db, actor.professor()?, id)
        .await
        .map(Json)
}

async fn grade_student(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, student_id)): Path<(i64, i64)>,
    JsonBody(submission): JsonBody<GradeSubmission>,
) -> Result<Json<academic_record::Model>> {
    records::grade_student(&state.db, &state.config, actor.professor()?, id, student_id, submission)
        .await
        .map(Json)
}
