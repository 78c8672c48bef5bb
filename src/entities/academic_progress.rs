//! Academic progress entity - Degree requirements and earned credits per student.
//!
//! Requirement columns are copied from configuration when the record is
//! opened. Earned columns and GPAs are a cache refreshed on ledger writes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Academic progress database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_progress")]
pub struct Model {
    /// Unique identifier for the progress record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// One progress record per student
    #[sea_orm(unique)]
    pub student_id: i64,
    /// e.g. "Bachelor of Science in Computer Science"
    pub degree_program: String,
    /// Major the requirements are evaluated against
    pub major: String,
    /// Academic year the student started under
    pub catalog_year: i32,
    /// Credits needed to graduate
    pub total_credits_required: i32,
    /// Credits needed from major courses
    pub major_credits_required: i32,
    /// Credits needed from general education courses
    pub general_education_credits_required: i32,
    /// Credits needed from electives
    pub elective_credits_required: i32,
    /// Earned credits across all graded records
    pub total_credits_earned: i32,
    /// Earned credits from courses in the major department
    pub major_credits_earned: i32,
    /// Earned credits from general education courses
    pub general_education_credits_earned: i32,
    /// Earned credits from everything else
    pub elective_credits_earned: i32,
    /// Cached cumulative GPA
    pub cumulative_gpa: f64,
    /// Cached GPA over major courses
    pub major_gpa: f64,
    /// Cached GPA of the latest term
    pub semester_gpa: f64,
    /// Whether the student is on pace to graduate on time
    pub is_on_track: bool,
    /// Set by the student; derived from remaining credits when absent
    pub expected_graduation_date: Option<Date>,
    /// When the record was opened
    pub created_at: DateTimeUtc,
    /// Last cache refresh
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `AcademicProgress` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student the progress belongs to
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
