//! `/academic-records` - the student's ledger, GPA, progress and transcripts.

use crate::{
    api::{
        AppState,
        extract::{CurrentActor, JsonBody, QueryParams},
    },
    core::{
        gpa::{GpaSummary, TermGpa},
        progress::{self, NewProgress, ProgressSummary, ProgressUpdate},
        records::{self, AcademicSummary, GradeHistoryEntry, RecordFilter},
        transcripts::{self, TranscriptRequest},
    },
    entities::{TranscriptStatus, academic_progress, academic_record, transcript},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;

/// Body of a student note edit
#[derive(Debug, Deserialize)]
pub struct NotesUpdate {
    /// Replacement note; `null` clears it
    pub student_notes: Option<String>,
}

/// Body of a transcript status change
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// Target transcript status
    pub status: TranscriptStatus,
}

/// Routes nested under `/academic-records`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/grades", get(list_grades))
        .route("/grades/:id", get(show_grade).put(update_notes))
        .route("/gpa", get(gpa))
        .route("/gpa/semester-breakdown", get(semester_breakdown))
        .route("/grade-history", get(grade_history))
        .route("/academic-summary", get(academic_summary))
        .route("/progress", get(show_progress).post(open_progress).put(update_progress))
        .route("/progress/summary", get(progress_summary))
        .route("/transcripts", get(list_transcripts))
        .route("/transcripts/generate", post(generate_transcript))
        .route("/transcripts/:id", get(show_transcript))
        .route("/transcripts/:id/download", get(download_transcript))
        .route("/transcripts/:id/status", put(update_transcript_status))
}

async fn list_grades(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    QueryParams(filter): QueryParams<RecordFilter>,
) -> Result<Json<Vec<academic_record::Model>>> {
    records::list_student_records(&state.db, actor.student()?, &filter)
        .await
        .map(Json)
}

async fn show_grade(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<academic_record::Model>> {
    records::get_record(&state.db, &actor, id).await.map(Json)
}

async fn update_notes(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<NotesUpdate>,
) -> Result<Json<academic_record::Model>> {
    records::update_student_notes(&state.db, &state.config, actor.student()?, id, update.student_notes)
        .await
        .map(Json)
}

async fn gpa(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> Result<Json<GpaSummary>> {
    records::gpa_summary(&state.db, &state.config, actor.student()?)
        .await
        .map(Json)
}

async fn semester_breakdown(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> Result<Json<Vec<TermGpa>>> {
    let summary = records::gpa_summary(&state.db, &state.config, actor.student()?).await?;
    Ok(Json(summary.semester_breakdown))
}

async fn grade_history(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<GradeHistoryEntry>>> {
    records::grade_history(&state.db, actor.student()?).await.map(Json)
}

async fn academic_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<AcademicSummary>> {
    records::academic_summary(&state.db, &state.config, actor.student()?)
        .await
        .map(Json)
}

async fn open_progress(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(new): JsonBody<NewProgress>,
) -> Result<Json<academic_progress::Model>> {
    progress::open_progress(&state.db, &state.config, actor.student()?, new)
        .await
        .map(Json)
}

async fn show_progress(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<academic_progress::Model>> {
    progress::get_progress(&state.db, actor.student()?).await.map(Json)
}

async fn update_progress(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(update): JsonBody<ProgressUpdate>,
) -> Result<Json<academic_progress::Model>> {
    progress::update_progress(&state.db, &state.config, actor.student()?, update)
        .await
        .map(Json)
}

async fn progress_summary(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> Result<Json<ProgressSummary>> {
    progress::progress_summary(&state.db, &state.config, actor.student()?)
        .await
        .map(Json)
}

async fn generate_transcript(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<TranscriptRequest>,
) -> Result<Json<transcript::Model>> {
    transcripts::generate_transcript(&state.db, &state.config, actor.student()?, request)
        .await
        .map(Json)
}

async fn list_transcripts(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<transcript::Model>>> {
    transcripts::list_transcripts(&state.db, actor.student()?).await.map(Json)
}

async fn show_transcript(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<transcript::Model>> {
    transcripts::get_transcript(&state.db, actor.student()?, id)
        .await
        .map(Json)
}

async fn download_transcript(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let document = transcripts::download_transcript(&state.db, actor.student()?, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.content,
    ))
}

async fn update_transcript_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<transcript::Model>> {
    transcripts::update_transcript_status(&state.db, actor.student()?, id, update.status)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_client::{login, register_professor, register_student, send, test_app};
    use crate::errors::Result;
    use axum::{
        Router,
        http::{Method, StatusCode},
    };
    use serde_json::json;

    async fn graded_student(app: &Router) -> (String, String) {
        register_professor(app, "p@example.edu", "PROF001", "Computer Science").await;
        register_student(app, "s@example.edu", "STU001").await;
        let prof = login(app, "p@example.edu").await;
        let stu = login(app, "s@example.edu").await;
        let (_, me) = send(app, Method::GET, "/auth/me/student", Some(&stu), None).await;
        let student_id = me["id"].as_i64().unwrap();

        for (code, semester, grade) in [("CS101", "Spring", "A"), ("CS102", "Fall", "B")] {
            let (_, course) = send(
                app,
                Method::POST,
                "/professors/courses",
                Some(&prof),
                Some(json!({
                    "course_code": code,
                    "title": format!("Course {code}"),
                    "credits": 3,
                    "semester": semester,
                    "year": 2024,
                    "max_enrollment": 10,
                })),
            )
            .await;
            let course_id = course["id"].as_i64().unwrap();
            send(app, Method::POST, "/students/courses/enroll", Some(&stu), Some(json!({ "course_id": course_id }))).await;
            let (status, _) = send(
                app,
                Method::PUT,
                &format!("/professors/courses/{course_id}/grades/{student_id}"),
                Some(&prof),
                Some(json!({ "letter_grade": grade })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        (prof, stu)
    }

    #[tokio::test]
    async fn test_ledger_and_gpa_routes() -> Result<()> {
        let app = test_app().await?;
        let (prof, stu) = graded_student(&app).await;

        let (status, grades) = send(&app, Method::GET, "/academic-records/grades?semester=Fall", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(grades.as_array().unwrap().len(), 1);
        let record_id = grades[0]["id"].as_i64().unwrap();

        let (status, _) = send(&app, Method::GET, "/academic-records/grades?status=bogus", Some(&stu), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, record) = send(
            &app,
            Method::PUT,
            &format!("/academic-records/grades/{record_id}"),
            Some(&stu),
            Some(json!({ "student_notes": "Hard course" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["student_notes"], "Hard course");

        let (status, _) = send(&app, Method::GET, &format!("/academic-records/grades/{record_id}"), Some(&prof), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, gpa) = send(&app, Method::GET, "/academic-records/gpa", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gpa["cumulative_gpa"], json!(3.5));
        assert_eq!(gpa["total_credits_earned"], 6);

        let (status, terms) = send(&app, Method::GET, "/academic-records/gpa/semester-breakdown", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(terms[0]["semester"], "Spring");
        assert_eq!(terms[1]["semester"], "Fall");

        let (status, history) = send(&app, Method::GET, "/academic-records/grade-history", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["course_code"], "CS101");

        let (status, summary) = send(&app, Method::GET, "/academic-records/academic-summary", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["student"]["student_number"], "STU001");
        assert_eq!(summary["cumulative_gpa"], json!(3.5));
        assert_eq!(summary["records"]["courses_completed"], 2);
        assert!(summary["progress"].is_null());
        let (status, _) = send(&app, Method::GET, "/academic-records/academic-summary", Some(&prof), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_progress_and_transcript_routes() -> Result<()> {
        let app = test_app().await?;
        let (_, stu) = graded_student(&app).await;

        let (status, _) = send(&app, Method::POST, "/academic-records/transcripts/generate", Some(&stu), Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, progress) = send(
            &app,
            Method::POST,
            "/academic-records/progress",
            Some(&stu),
            Some(json!({ "degree_program": "BS Computer Science", "catalog_year": 2024 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(progress["total_credits_earned"], 6);

        let (status, summary) = send(&app, Method::GET, "/academic-records/progress/summary", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["degree_program"], "BS Computer Science");

        let (status, transcript) = send(
            &app,
            Method::POST,
            "/academic-records/transcripts/generate",
            Some(&stu),
            Some(json!({ "transcript_type": "unofficial" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(transcript["status"], "draft");
        let transcript_id = transcript["id"].as_i64().unwrap();

        let (status, list) = send(&app, Method::GET, "/academic-records/transcripts", Some(&stu), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let status_uri = format!("/academic-records/transcripts/{transcript_id}/status");
        let (status, _) = send(&app, Method::PUT, &status_uri, Some(&stu), Some(json!({ "status": "draft" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, Method::PUT, &status_uri, Some(&stu), Some(json!({ "status": "official" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "official");
        Ok(())
    }
}
