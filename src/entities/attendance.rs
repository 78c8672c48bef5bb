//! Attendance entity - One row per student per class session.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance mark for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Attended
    #[sea_orm(string_value = "present")]
    Present,
    /// Did not attend
    #[sea_orm(string_value = "absent")]
    Absent,
    /// Arrived late
    #[sea_orm(string_value = "late")]
    Late,
    /// Absence excused; counts as attended
    #[sea_orm(string_value = "excused")]
    Excused,
    /// Arrived after the tardy cutoff
    #[sea_orm(string_value = "tardy")]
    Tardy,
}

/// Attendance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    /// Unique identifier for the mark
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the mark is for
    pub student_id: i64,
    /// Course session the mark is for
    pub course_id: i64,
    /// Session date; one mark per student, course and date
    pub attendance_date: Date,
    /// Present, absent, late, excused or tardy
    pub status: AttendanceStatus,
    /// Minutes late for `late`/`tardy` marks, never negative
    pub late_minutes: i32,
    /// Free-form remark from the professor
    pub notes: Option<String>,
    /// Professor who took the register
    pub recorded_by: i64,
    /// When the mark was last written
    pub recorded_at: DateTimeUtc,
}

/// Defines relationships between Attendance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student the mark is for
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Course the session belongs to
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
