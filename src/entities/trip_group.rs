//! Trip group entity - A set of travelers planning one trip together.
//!
//! Each group has a destination, a date range, and exactly one leader. The leader
//! is also stored as a regular row in `group_members`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trip group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip_groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the group (e.g., "Lisbon crew")
    pub name: String,
    /// Where the group is going
    pub destination: String,
    /// First day of the trip
    pub start_date: Date,
    /// Last day of the trip (inclusive)
    pub end_date: Date,
    /// Discord user ID of the group leader
    pub leader_id: String,
    /// When the group was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between a group and its members, budget and expenses
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One group has many members
    #[sea_orm(has_many = "super::group_member::Entity")]
    Members,
    /// One group has many category allocations
    #[sea_orm(has_many = "super::category_allocation::Entity")]
    Allocations,
    /// One group has many expenses
    #[sea_orm(has_many = "super::group_expense::Entity")]
    Expenses,
    /// One group has many finalized plan proposals
    #[sea_orm(has_many = "super::finalized_plan::Entity")]
    Plans,
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::category_allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl Related<super::group_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::finalized_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
