//! Finalized plan entity - A budget/itinerary snapshot put to a group vote.
//!
//! `category_budgets` holds a JSON object of category name to amount, and
//! `itinerary` optionally holds the serialized `AiTripPlanData` the plan was built
//! from. `status` is `"pending"` until a majority approves, then `"locked"`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Finalized plan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "finalized_plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the plan was proposed in
    pub group_id: i64,
    /// Total budget the plan commits to
    pub total_budget: f64,
    /// JSON object mapping category name to budgeted amount
    #[sea_orm(column_type = "Text")]
    pub category_budgets: String,
    /// Serialized itinerary, if the plan carries one
    #[sea_orm(column_type = "Text")]
    pub itinerary: Option<String>,
    /// `"pending"` or `"locked"`
    pub status: String,
    /// Whether locking the plan overwrites the group budget
    pub sync_to_budget: bool,
    /// When the plan was proposed
    pub created_at: DateTimeUtc,
    /// When the plan reached majority approval
    pub locked_at: Option<DateTimeUtc>,
}

/// Defines relationships between a plan, its group and its approvals
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning group
    #[sea_orm(
        belongs_to = "super::trip_group::Entity",
        from = "Column::GroupId",
        to = "super::trip_group::Column::Id"
    )]
    Group,
    /// One plan has many approval votes
    #[sea_orm(has_many = "super::plan_approval::Entity")]
    Approvals,
}

impl Related<super::trip_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::plan_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approvals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
