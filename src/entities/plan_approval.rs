//! Plan approval entity - One member's vote for a finalized plan.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan approval database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plan_approvals")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Plan being approved
    pub plan_id: i64,
    /// Discord user ID of the voter
    pub user_id: String,
    /// When the vote was cast
    pub approved_at: DateTimeUtc,
}

/// Each approval belongs to one plan
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Plan voted on
    #[sea_orm(
        belongs_to = "super::finalized_plan::Entity",
        from = "Column::PlanId",
        to = "super::finalized_plan::Column::Id"
    )]
    Plan,
}

impl Related<super::finalized_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
