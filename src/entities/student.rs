//! Student entity - Profile owned 1:1 by a student [`super::user`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Unique identifier for the student profile
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Institutional student number (e.g. "STU2024001")
    #[sea_orm(unique)]
    pub student_id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Declared major; matched against course departments for the major GPA
    pub major: Option<String>,
    /// Freshman, Sophomore, Junior, Senior
    pub year_level: Option<String>,
    /// When the student registered
    pub enrollment_date: DateTimeUtc,
    /// Graduation date chosen by the student, if any
    pub graduation_date: Option<Date>,
}

impl Model {
    /// "First Last"
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning user; deleting the user deletes the profile
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Course enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
    /// Grade ledger rows
    #[sea_orm(has_many = "super::academic_record::Entity")]
    AcademicRecords,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
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
