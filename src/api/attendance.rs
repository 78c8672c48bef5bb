//! `/attendance` - marks, course registers and reports.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, JsonBody, QueryParams},
    },
    core::attendance::{self, AttendanceEntry, AttendanceReport, AttendanceSummary, BulkAttendance},
    entities::attendance as attendance_entity,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

/// Query string of the course register
#[derive(Debug, Default, Deserialize)]
pub struct DateFilter {
    /// Only marks for this session date
    pub date: Option<NaiveDate>,
}

/// Routes nested under `/attendance`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(record))
        .route("/bulk", post(record_bulk))
        .route("/courses/:course_id", get(course_register))
        .route("/courses/:course_id/report", get(course_report))
        .route("/me/:course_id", get(my_attendance))
}

async fn record(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(entry): JsonBody<AttendanceEntry>,
) -> Result<Json<attendance_entity::Model>> {
    attendance::record_attendance(&state.db, actor.professor()?, entry)
        .await
        .map(Json)
}

async fn record_bulk(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(bulk): JsonBody<BulkAttendance>,
) -> Result<Json<Vec<attendance_entity::Model>>> {
    attendance::record_bulk_attendance(&state.db, actor.professor()?, bulk)
        .await
        .map(Json)
}

async fn course_register(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<i64>,
    QueryParams(filter): QueryParams<DateFilter>,
) -> Result<Json<Vec<attendance_entity::Model>>> {
    attendance::course_attendance(&state.db, actor.professor()?, course_id, filter.date)
        .await
        .map(Json)
}

async fn course_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<i64>,
) -> Result<Json<AttendanceReport>> {
    attendance::course_report(&state.db, &state.config, actor.professor()?, course_id)
        .await
        .map(Json)
}

async fn my_attendance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<i64>,
) -> Result<Json<AttendanceSummary>> {
    attendance::student_attendance(&state.db, actor.student()?, course_id)
        .await
        .map(Json)
}
