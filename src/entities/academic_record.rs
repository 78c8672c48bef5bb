//! Academic record entity - One grade ledger row per (student, course, term).
//!
//! Rows are created pending at enrollment, graded by the owning professor and
//! never deleted: dropping a course moves the row to `withdrawn`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grade ledger row status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    /// Enrolled, not yet graded
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Final grade recorded
    #[sea_orm(string_value = "graded")]
    Graded,
    /// Grade of I; excluded from GPA unless policy says otherwise
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
    /// Dropped or grade of W; never counted in GPA
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

/// Academic record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_records")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Graded student
    pub student_id: i64,
    /// Course the grade belongs to
    pub course_id: i64,
    /// Term name copied from the course
    pub semester: String,
    /// Term year copied from the course
    pub year: i32,
    /// One of the fixed letter grades, see `core::grades::LetterGrade`
    pub letter_grade: Option<String>,
    /// Grade points in [0.0, 4.0]
    pub numeric_grade: Option<f64>,
    /// Percentage in [0.0, 100.0]
    pub percentage_grade: Option<f64>,
    /// Never exceeds `credits_attempted`
    pub credits_earned: i32,
    /// The course's credit hours
    pub credits_attempted: i32,
    /// Where the row is in its lifecycle
    pub status: GradeStatus,
    /// When the grade was last recorded
    pub grade_date: Option<DateTimeUtc>,
    /// Set by the grading professor
    pub professor_notes: Option<String>,
    /// Set by the student; the only field they may edit
    pub student_notes: Option<String>,
    /// Enrollment time
    pub created_at: DateTimeUtc,
    /// Last write
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `AcademicRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Graded student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Course the grade belongs to
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
