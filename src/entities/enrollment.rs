//! Enrollment entity - Join between students and courses.
//!
//! The composite primary key makes (student, course) unique, so a second
//! concurrent enrollment loses on the constraint.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enrollment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Currently enrolled; holds a seat
    #[sea_orm(string_value = "active")]
    Active,
    /// Withdrawn or removed by the professor
    #[sea_orm(string_value = "dropped")]
    Dropped,
    /// Graded
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Enrollment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    /// Enrolled student
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    /// Course enrolled in
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,
    /// Most recent (re-)enrollment time
    pub enrollment_date: DateTimeUtc,
    /// Active, dropped or completed
    pub status: EnrollmentStatus,
}

/// Defines relationships between Enrollment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Enrolled student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Course enrolled in
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
