//! Transcript entity - Immutable point-in-time snapshot of a student's record.
//!
//! Regeneration inserts a new row; the only mutation ever applied is the
//! status transition draft → official → archived.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transcript lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    /// Freshly generated
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Released by the student
    #[sea_orm(string_value = "official")]
    Official,
    /// Retired; no further transitions
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl TranscriptStatus {
    /// Whether a transcript may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Official) | (Self::Draft | Self::Official, Self::Archived)
        )
    }
}

/// Requested transcript flavour
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TranscriptType {
    /// Printed with the official heading
    #[default]
    #[sea_orm(string_value = "official")]
    Official,
    /// Printed with the unofficial heading
    #[sea_orm(string_value = "unofficial")]
    Unofficial,
}

/// Transcript database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transcripts")]
pub struct Model {
    /// Unique identifier for the transcript
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the transcript is for
    pub student_id: i64,
    /// Official or unofficial heading
    pub transcript_type: TranscriptType,
    /// Draft, official or archived
    pub status: TranscriptStatus,
    /// Incomplete records were listed and counted
    pub include_incomplete: bool,
    /// Withdrawn records were listed and counted
    pub include_withdrawn: bool,
    /// Snapshot of earned credits
    pub total_credits_earned: i32,
    /// Snapshot of attempted credits
    pub total_credits_attempted: i32,
    /// Snapshot of the cumulative GPA
    pub cumulative_gpa: f64,
    /// Snapshot of the major GPA
    pub major_gpa: f64,
    /// When the snapshot was taken
    pub generated_date: DateTimeUtc,
    /// Rendered document on disk, when a transcript directory is configured
    pub file_path: Option<String>,
    /// Hex SHA-256 of the rendered document
    pub file_hash: String,
}

/// Defines relationships between Transcript and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student the transcript is for
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(TranscriptStatus::Draft.can_transition_to(TranscriptStatus::Official));
        assert!(TranscriptStatus::Official.can_transition_to(TranscriptStatus::Archived));
        assert!(TranscriptStatus::Draft.can_transition_to(TranscriptStatus::Archived));
        assert!(!TranscriptStatus::Official.can_transition_to(TranscriptStatus::Draft));
        assert!(!TranscriptStatus::Archived.can_transition_to(TranscriptStatus::Official));
        assert!(!TranscriptStatus::Draft.can_transition_to(TranscriptStatus::Draft));
    }
}
