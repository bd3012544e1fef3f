//! Report generation business logic.
//!
//! This module assembles the data behind the budget overview and renders the
//! text fragments the bot layer puts into embeds. Rendering functions are pure
//! and framework-agnostic.

use crate::{
    core::{
        aggregation::{self, BudgetTotals, CategorySummary},
        budget,
        expense::{self, ExpenseWithSplits},
        group,
        itinerary::DayPlan,
        settlement::{self, MemberSummary, Transfer},
    },
    entities::trip_group,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::fmt::Write as _;

/// Everything the overview of one trip shows.
#[derive(Debug, Clone)]
pub struct TripReport {
    /// The group being reported on
    pub group: trip_group::Model,
    /// Whole-budget totals
    pub totals: BudgetTotals,
    /// Per-category spending
    pub categories: Vec<CategorySummary>,
    /// Per-member settlement figures
    pub members: Vec<MemberSummary>,
    /// Payments that would settle the group
    pub transfers: Vec<Transfer>,
    /// Most recent expenses
    pub recent_expenses: Vec<ExpenseWithSplits>,
}

/// Generates the report for a group.
///
/// # Arguments
/// * `db` - Database connection
/// * `group_id` - Group to report on
/// * `expense_limit` - Maximum number of recent expenses to include (default 10)
pub async fn generate_trip_report(
    db: &DatabaseConnection,
    group_id: i64,
    expense_limit: Option<u64>,
) -> Result<TripReport> {
    let group = group::require_group(db, group_id).await?;
    let view = budget::get_budget(db, group_id).await?;
    let expenses = expense::list_expenses(db, group_id).await?;
    let members = group::list_members(db, group_id).await?;

    let categories =
        aggregation::summarize_categories(expenses.iter().map(|e| &e.expense), &view.allocations);
    let totals = aggregation::budget_totals(view.total_budget, &categories);
    let member_summaries = settlement::compute_member_summaries(&members, &expenses);
    let transfers = settlement::suggest_transfers(&member_summaries);

    let limit = expense_limit.unwrap_or(10);
    let recent_expenses = expenses.into_iter().take(limit.try_into()?).collect();

    Ok(TripReport {
        group,
        totals,
        categories,
        members: member_summaries,
        transfers,
        recent_expenses,
    })
}

impl TripReport {
    /// Display name of a member, falling back to the raw ID.
    #[must_use]
    pub fn member_name<'a>(&'a self, user_id: &'a str) -> &'a str {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .map_or(user_id, |m| m.display_name.as_str())
    }
}

/// Generates a progress bar for how much of a budget is used.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`. The bar is
/// clamped to full; the percentage is not.
#[must_use]
pub fn format_progress_bar(percent_used: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent_used.clamp(0.0, 100.0);

    // Cast safety: clamped ∈ [0, 100] and length is small, so the product fits.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {percent_used:.1}%",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

/// Formats an amount with an explicit sign, e.g. "+$50.00" or "-$25.50".
#[must_use]
pub fn format_signed_amount(amount: f64) -> String {
    if amount >= 0.0 {
        format!("+${amount:.2}")
    } else {
        format!("-${:.2}", amount.abs())
    }
}

/// One line per category: name, spent of budgeted, bar and status.
#[must_use]
pub fn format_category_line(summary: &CategorySummary) -> String {
    format!(
        "**{}**: ${:.2} / ${:.2} {} ({})",
        summary.name,
        summary.spent,
        summary.budgeted,
        format_progress_bar(summary.percent_used, None),
        summary.status.label()
    )
}

/// Settlement figures of one member.
#[must_use]
pub fn format_settlement_line(summary: &MemberSummary) -> String {
    let standing = if summary.balance > settlement::SETTLED_EPSILON {
        "is owed"
    } else if summary.balance < -settlement::SETTLED_EPSILON {
        "owes"
    } else {
        "is settled"
    };
    format!(
        "**{}** paid ${:.2}, share ${:.2}, {standing} ({}) | settlement ${:.2}",
        summary.display_name,
        summary.total_paid,
        summary.total_owed,
        format_signed_amount(summary.balance),
        summary.final_settlement
    )
}

/// A suggested payment, using display names from `report`.
#[must_use]
pub fn format_transfer_line(report: &TripReport, transfer: &Transfer) -> String {
    format!(
        "{} → {}: ${:.2}",
        report.member_name(&transfer.from),
        report.member_name(&transfer.to),
        transfer.amount
    )
}

/// Summary line for an expense.
#[must_use]
pub fn format_expense_line(item: &ExpenseWithSplits) -> String {
    let expense = &item.expense;
    format!(
        "#{} {} | ${:.2} | {} | {} (paid by {}, split {} ways)",
        expense.id,
        expense.date,
        expense.amount,
        expense.category,
        expense.description,
        expense.paid_by_name,
        item.split_between.len()
    )
}

/// Multi-line rendering of one itinerary day.
///
/// # Errors
/// Returns `Error::Fmt` if formatting fails.
pub fn format_day(day: &DayPlan) -> Result<String> {
    let mut out = format!("**Day {}: {}**", day.day, day.title);
    if !day.date.is_empty() {
        write!(out, " ({})", day.date)?;
    }
    for (slot, activity) in day.slots() {
        if activity.name.is_empty() {
            continue;
        }
        write!(out, "\n{slot}: {}", activity.name)?;
        if !activity.time.is_empty() {
            write!(out, " at {}", activity.time)?;
        }
        if !activity.location.is_empty() {
            write!(out, ", {}", activity.location)?;
        }
        write!(out, " (${:.2})", activity.cost)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::aggregation::BudgetStatus;
    use crate::core::itinerary::Activity;
    use crate::test_utils::*;

    #[test]
    fn test_format_progress_bar() {
        assert_eq!(format_progress_bar(100.0, Some(10)), "[██████████] 100.0%");
        assert_eq!(format_progress_bar(50.0, Some(10)), "[█████░░░░░] 50.0%");
        assert_eq!(format_progress_bar(0.0, Some(10)), "[░░░░░░░░░░] 0.0%");
    }

    #[test]
    fn test_format_progress_bar_overspent() {
        // The bar is capped, the number is not
        assert_eq!(format_progress_bar(130.0, Some(5)), "[█████] 130.0%");
    }

    #[test]
    fn test_format_signed_amount() {
        assert_eq!(format_signed_amount(50.0), "+$50.00");
        assert_eq!(format_signed_amount(-123.45), "-$123.45");
        assert_eq!(format_signed_amount(0.0), "+$0.00");
    }

    #[test]
    fn test_format_category_line() {
        let summary = CategorySummary {
            name: "Food".to_string(),
            color: "#000000".to_string(),
            budgeted: 200.0,
            spent: 190.0,
            remaining: 10.0,
            percent_used: 95.0,
            status: BudgetStatus::Warning,
        };
        assert_eq!(
            format_category_line(&summary),
            "**Food**: $190.00 / $200.00 [██████████] 95.0% (almost spent)"
        );
    }

    #[test]
    fn test_format_day_skips_empty_slots() -> Result<()> {
        let day = DayPlan {
            day: 2,
            date: "2026-06-02".to_string(),
            title: "Belem".to_string(),
            morning: Activity {
                name: "Tower".to_string(),
                time: "09:00".to_string(),
                cost: 20.0,
                location: "Belem".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(
            format_day(&day)?,
            "**Day 2: Belem** (2026-06-02)\nMorning: Tower at 09:00, Belem ($20.00)"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_trip_report() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        create_test_expense(&db, group.id, ALICE, "Food", 90.0).await?;
        create_test_expense(&db, group.id, BOB, "Lodging", 300.0).await?;

        let report = generate_trip_report(&db, group.id, Some(1)).await?;

        assert_eq!(report.totals.total_budget, 1000.0);
        assert_eq!(report.totals.total_spent, 390.0);
        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.members.len(), 3);
        assert_eq!(report.recent_expenses.len(), 1);

        // Everyone owes Bob for lodging
        let paid_to_bob: f64 = report
            .transfers
            .iter()
            .filter(|t| t.to == BOB)
            .map(|t| t.amount)
            .sum();
        assert_eq!(paid_to_bob, 170.0);

        let line = format_transfer_line(&report, &report.transfers[0]);
        assert!(line.contains("Lea"));
        Ok(())
    }
}
