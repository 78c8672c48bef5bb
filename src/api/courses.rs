//! `/courses` - public catalog of active courses.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, QueryParams},
    },
    core::courses::{self, CourseFilter, CourseListing},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

/// Routes nested under `/courses`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list)).route("/:id", get(show))
}

async fn list(
    State(state): State<AppState>,
    _actor: CurrentActor,
    QueryParams(filter): QueryParams<CourseFilter>,
) -> Result<Json<Vec<CourseListing>>> {
    courses::list_active_courses(&state.db, &filter).await.map(Json)
}

async fn show(State(state): State<AppState>, _actor: CurrentActor, Path(id): Path<i64>) -> Result<Json<CourseListing>> {
    courses::get_course(&state.db, id).await.map(Json)
}
