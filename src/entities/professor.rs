//! Professor entity - Profile owned 1:1 by a professor [`super::user`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Professor database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "professors")]
pub struct Model {
    /// Unique identifier for the professor profile
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Institutional staff number (e.g. "PROF001")
    #[sea_orm(unique)]
    pub professor_id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Department; scopes the student directory
    pub department: String,
    /// Assistant Professor, Associate Professor, ...
    pub title: Option<String>,
    /// Research or teaching area
    pub specialization: Option<String>,
    /// Office room, e.g. "CS 210"
    pub office_location: Option<String>,
}

/// Defines relationships between Professor and other entities
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
    /// Courses taught
    #[sea_orm(has_many = "super::course::Entity")]
    Courses,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
