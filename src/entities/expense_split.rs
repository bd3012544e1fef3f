//! Expense split entity - One participant of a split expense.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense split database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Expense being split
    pub expense_id: i64,
    /// Discord user ID sharing the cost
    pub user_id: String,
}

/// Each split row belongs to one expense
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning expense
    #[sea_orm(
        belongs_to = "super::group_expense::Entity",
        from = "Column::ExpenseId",
        to = "super::group_expense::Column::Id"
    )]
    Expense,
}

impl Related<super::group_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
