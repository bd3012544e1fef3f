//! Group member entity - One traveler's membership in a trip group.
//!
//! Besides identity, a member carries the two numbers settlement needs: the share
//! of the budget they committed to and what is left in their wallet.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group member database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    /// Unique identifier for the membership row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group this membership belongs to
    pub group_id: i64,
    /// Discord user ID of the member
    pub user_id: String,
    /// Name shown in reports
    pub display_name: String,
    /// Amount this member committed to the group budget
    pub budget_share: f64,
    /// What remains of the member's committed share
    pub wallet_balance: f64,
    /// When the member joined
    pub joined_at: DateTimeUtc,
}

/// Each member belongs to one group
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
