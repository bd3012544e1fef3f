//! Settlement computation - who owes whom after the trip.
//!
//! Each member's net `balance` is what they paid minus their equal share of every
//! expense they took part in; across a group these balances sum to zero.
//! `final_settlement` additionally reconciles the member's committed budget share
//! against their wallet.
//!
//! [`suggest_transfers`] turns the net balances into a short list of payments by
//! repeatedly pairing the largest debtor with the largest creditor.

use crate::{
    core::{expense, expense::ExpenseWithSplits, group},
    entities::group_member,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tracing::debug;

/// Balances smaller than this are considered settled.
pub const SETTLED_EPSILON: f64 = 0.01;

/// Rounds to cents.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derived money figures for one member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSummary {
    /// Discord user ID
    pub user_id: String,
    /// Display name
    pub display_name: String,
    /// Committed budget share
    pub budget_share: f64,
    /// Sum of expenses this member paid
    pub total_paid: f64,
    /// Sum of this member's shares of split expenses
    pub total_owed: f64,
    /// `total_paid - total_owed`; positive means the group owes this member
    pub balance: f64,
    /// What remains of the member's committed share
    pub wallet_balance: f64,
    /// `budget_share - wallet_balance`
    pub personal_expenses: f64,
    /// `total_paid - personal_expenses`
    pub shared_expenses_paid: f64,
    /// `budget_share - personal_expenses - total_owed + shared_expenses_paid`
    pub final_settlement: f64,
}

/// A suggested payment between two members.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// Payer user ID
    pub from: String,
    /// Recipient user ID
    pub to: String,
    /// Amount to pay
    pub amount: f64,
}

/// Computes the summary of every member from the group's expenses.
///
/// Shares owed by IDs that are no longer members are dropped, so balances only
/// net to zero when every split participant is still in the group.
#[must_use]
pub fn compute_member_summaries(
    members: &[group_member::Model],
    expenses: &[ExpenseWithSplits],
) -> Vec<MemberSummary> {
    let mut paid: HashMap<&str, f64> = HashMap::new();
    let mut owed: HashMap<&str, f64> = HashMap::new();

    for item in expenses {
        *paid.entry(item.expense.paid_by_id.as_str()).or_default() += item.expense.amount;
        let share = item.share_per_member();
        for user_id in &item.split_between {
            *owed.entry(user_id.as_str()).or_default() += share;
        }
    }

    members
        .iter()
        .map(|m| {
            let total_paid = paid.get(m.user_id.as_str()).copied().unwrap_or(0.0);
            let total_owed = owed.get(m.user_id.as_str()).copied().unwrap_or(0.0);
            let personal_expenses = m.budget_share - m.wallet_balance;
            let shared_expenses_paid = total_paid - personal_expenses;
            let final_settlement =
                m.budget_share - personal_expenses - total_owed + shared_expenses_paid;

            MemberSummary {
                user_id: m.user_id.clone(),
                display_name: m.display_name.clone(),
                budget_share: round2(m.budget_share),
                total_paid: round2(total_paid),
                total_owed: round2(total_owed),
                balance: round2(total_paid - total_owed),
                wallet_balance: round2(m.wallet_balance),
                personal_expenses: round2(personal_expenses),
                shared_expenses_paid: round2(shared_expenses_paid),
                final_settlement: round2(final_settlement),
            }
        })
        .collect()
}

/// Pairs debtors with creditors until every balance is within [`SETTLED_EPSILON`].
#[must_use]
pub fn suggest_transfers(summaries: &[MemberSummary]) -> Vec<Transfer> {
    let mut debtors: Vec<(String, f64)> = summaries
        .iter()
        .filter(|s| s.balance < -SETTLED_EPSILON)
        .map(|s| (s.user_id.clone(), -s.balance))
        .collect();
    let mut creditors: Vec<(String, f64)> = summaries
        .iter()
        .filter(|s| s.balance > SETTLED_EPSILON)
        .map(|s| (s.user_id.clone(), s.balance))
        .collect();

    let by_amount_desc = |a: &(String, f64), b: &(String, f64)| {
        b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
    };

    let mut transfers = Vec::new();
    loop {
        debtors.sort_by(by_amount_desc);
        creditors.sort_by(by_amount_desc);

        let (Some(debtor), Some(creditor)) = (debtors.first_mut(), creditors.first_mut()) else {
            break;
        };

        let amount = round2(debtor.1.min(creditor.1));
        if amount < SETTLED_EPSILON {
            break;
        }

        transfers.push(Transfer {
            from: debtor.0.clone(),
            to: creditor.0.clone(),
            amount,
        });
        debtor.1 -= amount;
        creditor.1 -= amount;

        debtors.retain(|d| d.1 >= SETTLED_EPSILON);
        creditors.retain(|c| c.1 >= SETTLED_EPSILON);
    }

    transfers
}

/// Loads a group's members and expenses and computes their summaries.
pub async fn settlement_for_group(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<MemberSummary>> {
    group::require_group(db, group_id).await?;
    let members = group::list_members(db, group_id).await?;
    let expenses = expense::list_expenses(db, group_id).await?;

    let summaries = compute_member_summaries(&members, &expenses);
    debug!(
        "Computed settlement for {} members of group {}",
        summaries.len(),
        group_id
    );
    Ok(summaries)
}
