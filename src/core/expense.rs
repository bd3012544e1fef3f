//! Expense business logic - Handles group expenses and who they are split between.
//!
//! An expense and its split rows are always written and deleted together in one
//! database transaction. Adding an expense enforces the category lock rule: a
//! locked category only accepts expenses from the group leader.

use crate::{
    core::{budget, group},
    entities::{ExpenseSplit, GroupExpense, expense_split, group_expense},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Input for logging a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Category the expense counts against
    pub category: String,
    /// Amount paid, must be positive
    pub amount: f64,
    /// What the money was spent on
    pub description: String,
    /// Day the expense happened
    pub date: NaiveDate,
    /// Optional receipt link
    pub receipt_url: Option<String>,
    /// Member IDs sharing the cost; empty means everyone in the group
    pub split_between: Vec<String>,
}

/// An expense together with the member IDs it is split between.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseWithSplits {
    /// The expense row
    pub expense: group_expense::Model,
    /// User IDs sharing the cost
    pub split_between: Vec<String>,
}

impl ExpenseWithSplits {
    /// Equal share of the expense owed by each participant.
    #[must_use]
    pub fn share_per_member(&self) -> f64 {
        if self.split_between.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)] // Split lists are tiny
        let count = self.split_between.len() as f64;
        self.expense.amount / count
    }
}

/// Logs an expense paid by `payer_id`.
///
/// # Errors
/// Returns an error if:
/// - The amount is zero, negative or not finite
/// - The description is empty
/// - The payer or any split participant is not a group member
/// - The category is not allocated in the group budget
/// - The category is locked and the payer is not the leader
/// - The database insert fails
pub async fn add_expense(
    db: &DatabaseConnection,
    group_id: i64,
    payer_id: &str,
    new_expense: NewExpense,
) -> Result<ExpenseWithSplits> {
    if !new_expense.amount.is_finite() || new_expense.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: new_expense.amount,
        });
    }

    if new_expense.description.trim().is_empty() {
        return Err(Error::Config {
            message: "Expense description cannot be empty".to_string(),
        });
    }

    let group = group::require_group(db, group_id).await?;
    let payer = group::require_member(db, group_id, payer_id).await?;

    let view = budget::get_budget(db, group_id).await?;
    let allocation =
        view.allocation(&new_expense.category)
            .ok_or_else(|| Error::CategoryNotFound {
                name: new_expense.category.clone(),
            })?;

    if !budget::can_submit_to_category(&group, allocation, payer_id) {
        warn!(
            "User {} tried to add an expense to locked category '{}' in group {}",
            payer_id, new_expense.category, group_id
        );
        return Err(Error::CategoryLocked {
            name: new_expense.category,
        });
    }

    let members = group::list_members(db, group_id).await?;
    let split_between = if new_expense.split_between.is_empty() {
        members.iter().map(|m| m.user_id.clone()).collect()
    } else {
        let mut ids = new_expense.split_between.clone();
        ids.sort();
        ids.dedup();
        if let Some(outsider) = ids
            .iter()
            .find(|id| !members.iter().any(|m| &m.user_id == *id))
        {
            return Err(Error::NotMember {
                group_id,
                user_id: outsider.clone(),
            });
        }
        ids
    };

    let txn = db.begin().await?;

    let expense = group_expense::ActiveModel {
        group_id: Set(group_id),
        category: Set(new_expense.category),
        amount: Set(new_expense.amount),
        description: Set(new_expense.description.trim().to_string()),
        paid_by_id: Set(payer.user_id.clone()),
        paid_by_name: Set(payer.display_name.clone()),
        date: Set(new_expense.date),
        receipt_url: Set(new_expense.receipt_url),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for user_id in &split_between {
        expense_split::ActiveModel {
            expense_id: Set(expense.id),
            user_id: Set(user_id.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        "Expense {} in group {}: {:.2} for '{}' paid by {}, split {} ways",
        expense.id,
        group_id,
        expense.amount,
        expense.category,
        expense.paid_by_id,
        split_between.len()
    );

    Ok(ExpenseWithSplits {
        expense,
        split_between,
    })
}

/// Retrieves all expenses of a group with their splits, newest first.
pub async fn list_expenses<C>(db: &C, group_id: i64) -> Result<Vec<ExpenseWithSplits>>
where
    C: ConnectionTrait,
{
    let expenses = GroupExpense::find()
        .filter(group_expense::Column::GroupId.eq(group_id))
        .order_by_desc(group_expense::Column::Date)
        .order_by_desc(group_expense::Column::Id)
        .all(db)
        .await?;

    if expenses.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
    let mut splits: HashMap<i64, Vec<String>> = HashMap::new();
    for split in ExpenseSplit::find()
        .filter(expense_split::Column::ExpenseId.is_in(ids))
        .order_by_asc(expense_split::Column::Id)
        .all(db)
        .await?
    {
        splits.entry(split.expense_id).or_default().push(split.user_id);
    }

    debug!("Loaded {} expenses for group {}", expenses.len(), group_id);
    Ok(expenses
        .into_iter()
        .map(|expense| {
            let split_between = splits.remove(&expense.id).unwrap_or_default();
            ExpenseWithSplits {
                expense,
                split_between,
            }
        })
        .collect())
}

/// Retrieves a single expense with its splits.
pub async fn get_expense(
    db: &DatabaseConnection,
    expense_id: i64,
) -> Result<Option<ExpenseWithSplits>> {
    let Some(expense) = GroupExpense::find_by_id(expense_id).one(db).await? else {
        return Ok(None);
    };

    let split_between = ExpenseSplit::find()
        .filter(expense_split::Column::ExpenseId.eq(expense_id))
        .order_by_asc(expense_split::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|s| s.user_id)
        .collect();

    Ok(Some(ExpenseWithSplits {
        expense,
        split_between,
    }))
}

/// Deletes an expense and its splits.
///
/// Only the payer or the group leader may delete an expense.
///
/// # Errors
/// Returns `Error::ExpenseNotFound` if no such expense exists, or
/// `Error::PermissionDenied` if the actor may not delete it.
pub async fn delete_expense(
    db: &DatabaseConnection,
    expense_id: i64,
    actor_id: &str,
) -> Result<group_expense::Model> {
    let txn = db.begin().await?;

    let expense = GroupExpense::find_by_id(expense_id)
        .one(&txn)
        .await?
        .ok_or(Error::ExpenseNotFound { id: expense_id })?;

    let group = group::require_group(&txn, expense.group_id).await?;
    if expense.paid_by_id != actor_id && !group::is_leader(&group, actor_id) {
        return Err(Error::PermissionDenied {
            reason: "Only the payer or the group leader can delete an expense".to_string(),
        });
    }

    ExpenseSplit::delete_many()
        .filter(expense_split::Column::ExpenseId.eq(expense_id))
        .exec(&txn)
        .await?;
    expense.clone().delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted expense {} from group {} by {}",
        expense_id, expense.group_id, actor_id
    );
    Ok(expense)
}
