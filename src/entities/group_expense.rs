//! Group expense entity - Money one member paid on behalf of some of the group.
//!
//! Who the expense is split between is stored in `expense_splits`, one row per
//! member, so the equal share each of them owes can be derived.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the expense was logged in
    pub group_id: i64,
    /// Category name the expense counts against
    pub category: String,
    /// Amount paid, always positive
    pub amount: f64,
    /// What the money was spent on
    pub description: String,
    /// Discord user ID of the payer
    pub paid_by_id: String,
    /// Payer's display name at the time of logging
    pub paid_by_name: String,
    /// Day the expense happened
    pub date: Date,
    /// Optional link to a receipt image
    pub receipt_url: Option<String>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between an expense, its group and its splits
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning group
    #[sea_orm(
        belongs_to = "super::trip_group::Entity",
        from = "Column::GroupId",
        to = "super::trip_group::Column::Id"
    )]
    Group,
    /// One expense has many split rows
    #[sea_orm(has_many = "super::expense_split::Entity")]
    Splits,
}

impl Related<super::trip_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::expense_split::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
