//! Group budget entity - The total budget for a trip group.
//!
//! Per-category amounts live in `category_allocations`; this row only carries the
//! total they must add up to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_budgets")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group this budget belongs to (one budget per group)
    #[sea_orm(unique)]
    pub group_id: i64,
    /// Total trip budget in dollars
    pub total_budget: f64,
    /// When the budget was last saved
    pub updated_at: DateTimeUtc,
}

/// Each budget belongs to one group
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
