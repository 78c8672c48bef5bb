//! Transcript business logic - Snapshots of a student's ledger.
//!
//! Generating a transcript never mutates an earlier one: each call inserts a
//! new draft row, so the table is an audit trail. The rendered document is
//! plain text; its SHA-256 is stored with the row and, when an output
//! directory is configured, the document itself is written next to it.

use crate::{
    config::settings::{AppConfig, GradingPolicy},
    core::{
        gpa::{self, GpaSummary, LedgerEntry},
        records::load_records_with_courses,
    },
    entities::{
        AcademicProgress, GradeStatus, Transcript, TranscriptStatus, TranscriptType, academic_progress,
        academic_record, course, student, transcript,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

/// Transcript generation options
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TranscriptRequest {
    /// Heading to print, defaults to unofficial
    #[serde(default)]
    pub transcript_type: TranscriptType,
    /// List and count incomplete records
    #[serde(default)]
    pub include_incomplete: bool,
    /// List and count withdrawn records
    #[serde(default)]
    pub include_withdrawn: bool,
}

/// A rendered transcript ready to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptDocument {
    /// Suggested download name
    pub filename: String,
    /// The rendered text
    pub content: String,
}

/// Hex SHA-256 of a rendered document.
#[must_use]
pub fn document_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn selected(record: &academic_record::Model, request: &TranscriptRequest) -> bool {
    match record.status {
        GradeStatus::Graded => true,
        GradeStatus::Incomplete => request.include_incomplete,
        GradeStatus::Withdrawn => request.include_withdrawn,
        GradeStatus::Pending => false,
    }
}

/// Renders the transcript document.
#[must_use]
pub fn render_transcript(
    student: &student::Model,
    progress: &academic_progress::Model,
    rows: &[(academic_record::Model, course::Model)],
    summary: &GpaSummary,
    transcript_type: TranscriptType,
    generated_at: DateTime<Utc>,
) -> String {
    let heading = match transcript_type {
        TranscriptType::Official => "OFFICIAL ACADEMIC TRANSCRIPT",
        TranscriptType::Unofficial => "UNOFFICIAL ACADEMIC TRANSCRIPT",
    };
    let rule = "=".repeat(72);

    let mut lines = vec![
        rule.clone(),
        format!("{heading:^72}"),
        rule.clone(),
        format!("Student:        {}", student.full_name()),
        format!("Student ID:     {}", student.student_id),
        format!("Program:        {}", progress.degree_program),
        format!("Major:          {}", progress.major),
        format!("Catalog year:   {}", progress.catalog_year),
        format!("Generated:      {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
    ];

    let mut terms: Vec<(&str, i32)> = rows
        .iter()
        .map(|(record, _)| (record.semester.as_str(), record.year))
        .collect();
    terms.sort_by(|a, b| gpa::compare_terms(*a, *b));
    terms.dedup();

    for (semester, year) in terms {
        lines.push(String::new());
        lines.push(format!("{semester} {year}"));
        lines.push("-".repeat(72));
        lines.push(format!("{:<10} {:<36} {:>7} {:>6} {:>8}", "Course", "Title", "Credits", "Grade", "Points"));
        for (record, course) in rows.iter().filter(|(r, _)| r.semester == semester && r.year == year) {
            let title: String = course.title.chars().take(36).collect();
            lines.push(format!(
                "{:<10} {:<36} {:>7} {:>6} {:>8}",
                course.course_code,
                title,
                record.credits_attempted,
                record.letter_grade.as_deref().unwrap_or("-"),
                record
                    .numeric_grade
                    .map_or_else(|| "-".to_string(), |points| format!("{points:.2}")),
            ));
        }
        if let Some(term) = summary
            .semester_breakdown
            .iter()
            .find(|t| t.semester == semester && t.year == year)
        {
            lines.push(format!(
                "Term GPA: {:.3}   Credits earned: {}/{}",
                term.semester_gpa, term.credits_earned, term.credits_attempted
            ));
        }
    }

    lines.push(String::new());
    lines.push(rule.clone());
    lines.push(format!("Cumulative GPA:          {:.3}", summary.cumulative_gpa));
    lines.push(format!("Major GPA:               {:.3}", summary.major_gpa));
    lines.push(format!("Total credits earned:    {}", summary.total_credits_earned));
    lines.push(format!("Total credits attempted: {}", summary.total_credits_attempted));
    lines.push(rule);

    let mut doc = lines.join("\n");
    doc.push('\n');
    doc
}

/// Generates a new draft transcript for the student.
///
/// # Errors
/// [`Error::NotFound`] when the student has no progress record.
#[instrument(skip(db, config, student), fields(student_id = student.id))]
pub async fn generate_transcript(
    db: &DatabaseConnection,
    config: &AppConfig,
    student: &student::Model,
    request: TranscriptRequest,
) -> Result<transcript::Model> {
    let progress = AcademicProgress::find()
        .filter(academic_progress::Column::StudentId.eq(student.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Academic progress", &student.student_id))?;

    let rows: Vec<(academic_record::Model, course::Model)> = load_records_with_courses(db, student.id)
        .await?
        .into_iter()
        .filter(|(record, _)| selected(record, &request))
        .collect();
    let ledger: Vec<LedgerEntry> = rows
        .iter()
        .map(|(record, course)| LedgerEntry::new(record, course))
        .collect();
    let policy = GradingPolicy {
        count_incomplete: request.include_incomplete,
        count_withdrawn: request.include_withdrawn,
    };
    let summary = gpa::summarize(&ledger, Some(progress.major.as_str()), policy);

    let generated_at = Utc::now();
    let content = render_transcript(student, &progress, &rows, &summary, request.transcript_type, generated_at);
    let file_hash = document_hash(&content);

    let file_path = match &config.transcripts.output_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!(
                "transcript_{}_{}.txt",
                student.student_id,
                generated_at.format("%Y%m%d%H%M%S%3f")
            ));
            tokio::fs::write(&path, &content).await?;
            Some(path.to_string_lossy().into_owned())
        }
        None => None,
    };

    let transcript = transcript::ActiveModel {
        student_id: Set(student.id),
        transcript_type: Set(request.transcript_type),
        status: Set(TranscriptStatus::Draft),
        include_incomplete: Set(request.include_incomplete),
        include_withdrawn: Set(request.include_withdrawn),
        total_credits_earned: Set(summary.total_credits_earned),
        total_credits_attempted: Set(summary.total_credits_attempted),
        cumulative_gpa: Set(summary.cumulative_gpa),
        major_gpa: Set(summary.major_gpa),
        generated_date: Set(generated_at),
        file_path: Set(file_path),
        file_hash: Set(file_hash),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(transcript_id = transcript.id, "Generated transcript");
    Ok(transcript)
}

/// Lists the student's transcripts, newest first.
pub async fn list_transcripts(db: &DatabaseConnection, student: &student::Model) -> Result<Vec<transcript::Model>> {
    Transcript::find()
        .filter(transcript::Column::StudentId.eq(student.id))
        .order_by_desc(transcript::Column::GeneratedDate)
        .order_by_desc(transcript::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one of the student's transcripts.
pub async fn get_transcript(
    db: &DatabaseConnection,
    student: &student::Model,
    transcript_id: i64,
) -> Result<transcript::Model> {
    let transcript = Transcript::find_by_id(transcript_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Transcript", transcript_id))?;
    if transcript.student_id != student.id {
        return Err(Error::forbidden("You can only access your own transcripts"));
    }
    Ok(transcript)
}

/// Reads the stored document back and checks it against the recorded hash.
///
/// # Errors
/// [`Error::NotFound`] when the transcript was generated without an output
/// directory or its file has since been removed, [`Error::Validation`] when the file no longer matches its hash.
pub async fn download_transcript(
    db: &DatabaseConnection,
    student: &student::Model,
    transcript_id: i64,
) -> Result<TranscriptDocument> {
    let transcript = get_transcript(db, student, transcript_id).await?;
    let path = transcript
        .file_path
        .ok_or_else(|| Error::not_found("Transcript file", transcript_id))?;
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            warn!(transcript_id, path = %path, "Transcript file is missing");
            Error::not_found("Transcript file", transcript_id)
        } else {
            Error::from(e)
        }
    })?;
    if document_hash(&content) != transcript.file_hash {
        warn!(transcript_id, "Transcript file does not match its hash");
        return Err(Error::validation("Transcript file failed its integrity check"));
    }

    let filename = std::path::Path::new(&path)
        .file_name()
        .map_or_else(|| format!("transcript_{transcript_id}.txt"), |n| n.to_string_lossy().into_owned());
    Ok(TranscriptDocument { filename, content })
}

/// Moves a transcript along draft → official → archived.
///
/// # Errors
/// [`Error::Validation`] for any other transition.
pub async fn update_transcript_status(
    db: &DatabaseConnection,
    student: &student::Model,
    transcript_id: i64,
    status: TranscriptStatus,
) -> Result<transcript::Model> {
    let transcript = get_transcript(db, student, transcript_id).await?;
    if !transcript.status.can_transition_to(status) {
        return Err(Error::validation(format!(
            "Cannot move transcript from {:?} to {:?}",
            transcript.status, status
        )));
    }

    let mut active: transcript::ActiveModel = transcript.into();
    active.status = Set(status);
    let transcript = active.update(db).await?;
    info!(transcript_id, ?status, "Transcript status changed");
    Ok(transcript)
}
