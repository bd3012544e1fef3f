//! Category allocation entity - A named budget bucket inside a group budget.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category allocation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_allocations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group this allocation belongs to
    pub group_id: i64,
    /// Category name, unique within the group (e.g., "Food", "Lodging")
    pub name: String,
    /// Amount budgeted for this category
    pub budgeted: f64,
    /// Display color (hex, e.g. `"#4f46e5"`)
    pub color: String,
    /// Locked categories reject expenses from non-leader members
    pub is_locked: bool,
}

/// Each allocation belongs to one group
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning group
    #[sea_orm(
        belongs_to = "super::trip_group::Entity",
        from = "Column::GroupId",
        to = "super::trip_group::Column::Id"
    )]
    Group,
}

impl Related<super::trip_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
