//! `/directory` - student lookup for professors.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, QueryParams},
    },
    core::{
        directory::{self, DirectoryEntry, DirectoryFilter},
        gpa::GpaSummary,
        records::GradeHistoryEntry,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

/// Routes nested under `/directory`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students))
        .route("/students/:id", get(show_student))
        .route("/students/:id/records", get(student_records))
        .route("/students/:id/gpa", get(student_gpa))
}

async fn list_students(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(filter): QueryParams<DirectoryFilter>,
) -> Result<Json<Vec<DirectoryEntry>>> {
    directory::list_students(&state.db, actor.professor()?, &filter)
        .await
        .map(Json)
}

async fn show_student(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<DirectoryEntry>> {
    directory::get_student(&state.db, &actor, id).await.map(Json)
}

async fn student_records(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GradeHistoryEntry>>> {
    directory::student_records(&state.db, &actor, id).await.map(Json)
}

async fn student_gpa(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<GpaSummary>> {
    directory::student_gpa(&state.db, &state.config, &actor, id)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_client::{login, register_professor, register_student, send, test_app};
    use crate::errors::Result;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_directory_by_department() -> Result<()> {
        let app = test_app().await?;
        register_professor(&app, "p@example.edu", "PROF001", "Computer Science").await;
        register_professor(&app, "q@example.edu", "PROF002", "History").await;
        register_student(&app, "s@example.edu", "STU001").await;
        let cs = login(&app, "p@example.edu").await;
        let history = login(&app, "q@example.edu").await;
        let stu = login(&app, "s@example.edu").await;
        let (_, me) = send(&app, Method::GET, "/auth/me/student", Some(&stu), None).await;
        let student_id = me["id"].as_i64().unwrap();

        let (status, listed) = send(&app, Method::GET, "/directory/students", Some(&cs), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["email"], "s@example.edu");

        let (status, listed) = send(&app, Method::GET, "/directory/students", Some(&history), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(listed.as_array().unwrap().is_empty());

        let (status, _) = send(&app, Method::GET, &format!("/directory/students/{student_id}"), Some(&history), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, profile) = send(&app, Method::GET, &format!("/directory/students/{student_id}"), Some(&cs), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["student_id"], "STU001");

        // Department access does not extend to grades of students not taught
        let (status, _) = send(&app, Method::GET, &format!("/directory/students/{student_id}/gpa"), Some(&cs), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::GET, &format!("/directory/students/{student_id}/records"), Some(&cs), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/directory/students", Some(&stu), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }
}
