//! User entity - Authentication identity shared by students and professors.
//!
//! The role is fixed at registration time; the role-specific profile lives in
//! the `students` or `professors` table and is deleted together with the user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Enrolled learner
    #[sea_orm(string_value = "student")]
    Student,
    /// Course owner
    #[sea_orm(string_value = "professor")]
    Professor,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login email, unique across all users
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Student or professor
    pub role: UserRole,
    /// Inactive users cannot authenticate
    pub is_active: bool,
    /// When the user registered
    pub created_at: DateTimeUtc,
    /// Last profile or password change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and the role profiles
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student profile (only for student users)
    #[sea_orm(has_one = "super::student::Entity")]
    Student,
    /// Professor profile (only for professor users)
    #[sea_orm(has_one = "super::professor::Entity")]
    Professor,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::professor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Professor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
