//! Semester GPA entity - Denormalized per-term GPA cache.
//!
//! Rewritten from the grade ledger on every ledger write for that term;
//! reads of GPA go through the aggregator, not this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Semester GPA cache row
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "semester_gpas")]
pub struct Model {
    /// Unique identifier for the cache row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the term belongs to
    pub student_id: i64,
    /// Term name
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Quality points over GPA credits for the term
    pub semester_gpa: f64,
    /// Credits earned in the term
    pub credits_earned: i32,
    /// Credits counted toward the term GPA
    pub credits_attempted: i32,
    /// Sum of grade points times credits
    pub quality_points: f64,
    /// Graded courses that earned credit
    pub courses_completed: i32,
    /// Courses counted toward the term GPA
    pub courses_attempted: i32,
    /// Last refresh from the ledger
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SemesterGpa` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student the term belongs to
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
