//! Course entity - A course offering for one term, owned by exactly one professor.
//!
//! Courses are deactivated rather than deleted so grade ledger rows keep a
//! valid reference.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Degree-requirement bucket a course counts toward (besides the major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum CourseCategory {
    /// Required by the program
    #[sea_orm(string_value = "core")]
    Core,
    /// General education requirement
    #[sea_orm(string_value = "general_education")]
    GeneralEducation,
    /// Free elective
    #[sea_orm(string_value = "elective")]
    Elective,
}

/// Course database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    /// Unique identifier for the course offering
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog code (e.g. "CS101"); unique per (semester, year)
    pub course_code: String,
    /// Display title
    pub title: String,
    /// Catalog description
    pub description: Option<String>,
    /// Credit hours, copied into `credits_attempted` at enrollment
    pub credits: i32,
    /// Owning department; compared with the student's major for major GPA
    pub department: String,
    /// Requirement bucket the credits count toward
    pub category: CourseCategory,
    /// Term name, e.g. "Fall" or "Spring"
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Seat limit counted against active enrollments
    pub max_enrollment: i32,
    /// Owning professor
    pub professor_id: i64,
    /// Inactive courses accept no enrollments and are hidden from search
    pub is_active: bool,
    /// When the course was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Course and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each course belongs to one professor
    #[sea_orm(
        belongs_to = "super::professor::Entity",
        from = "Column::ProfessorId",
        to = "super::professor::Column::Id"
    )]
    Professor,
    /// Enrollments in this course
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
    /// Grade ledger rows for this course
    #[sea_orm(has_many = "super::academic_record::Entity")]
    AcademicRecords,
}

impl Related<super::professor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Professor.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::academic_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
