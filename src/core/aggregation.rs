//! Budget aggregation - per-category spent, budgeted and remaining amounts.
//!
//! Pure functions over already-loaded rows. The warning threshold follows the
//! budget page: a category with less than 10% of its budget left is flagged.

use crate::entities::{category_allocation, group_expense};
use std::collections::HashMap;

/// Fraction of a category budget below which remaining funds trigger a warning.
pub const WARNING_REMAINING_FRACTION: f64 = 0.10;

const UNALLOCATED_COLOR: &str = "#94a3b8";

/// Where a category stands against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Comfortably within budget
    UnderBudget,
    /// Less than 10% of the budget remains
    Warning,
    /// Spent more than budgeted
    OverBudget,
}

impl BudgetStatus {
    /// Classifies spending against a budget.
    #[must_use]
    pub fn classify(spent: f64, budgeted: f64) -> Self {
        let remaining = budgeted - spent;
        if spent > budgeted {
            Self::OverBudget
        } else if remaining < budgeted * WARNING_REMAINING_FRACTION {
            Self::Warning
        } else {
            Self::UnderBudget
        }
    }

    /// Short label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnderBudget => "on track",
            Self::Warning => "almost spent",
            Self::OverBudget => "over budget",
        }
    }
}

/// Spending in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    /// Category name
    pub name: String,
    /// Display color
    pub color: String,
    /// Amount budgeted (0.0 for categories without an allocation)
    pub budgeted: f64,
    /// Sum of expenses in the category
    pub spent: f64,
    /// `budgeted - spent`, negative when overspent
    pub remaining: f64,
    /// `spent / budgeted * 100`
    pub percent_used: f64,
    /// Classification against the budget
    pub status: BudgetStatus,
}

/// Whole-budget totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetTotals {
    /// Total budget of the group
    pub total_budget: f64,
    /// Sum of all expenses
    pub total_spent: f64,
    /// `total_budget - total_spent`
    pub total_remaining: f64,
    /// `total_spent / total_budget * 100`
    pub percent_used: f64,
}

/// Percentage of `budgeted` that `spent` represents.
///
/// With nothing budgeted, any spending counts as 100% used.
#[must_use]
pub fn percent_used(spent: f64, budgeted: f64) -> f64 {
    if budgeted > 0.0 {
        spent / budgeted * 100.0
    } else if spent > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Summarizes spending per category in a single pass over the expenses.
///
/// Allocated categories come first, in allocation order, followed by any
/// categories that have expenses but no allocation (sorted by name).
pub fn summarize_categories<'a, I>(
    expenses: I,
    allocations: &[category_allocation::Model],
) -> Vec<CategorySummary>
where
    I: IntoIterator<Item = &'a group_expense::Model>,
{
    let mut spent_by_category: HashMap<&str, f64> = HashMap::new();
    for expense in expenses {
        *spent_by_category.entry(expense.category.as_str()).or_default() += expense.amount;
    }

    let mut summaries: Vec<CategorySummary> = allocations
        .iter()
        .map(|a| {
            let spent = spent_by_category.remove(a.name.as_str()).unwrap_or(0.0);
            build_summary(a.name.clone(), a.color.clone(), a.budgeted, spent)
        })
        .collect();

    let mut leftovers: Vec<(&str, f64)> = spent_by_category.into_iter().collect();
    leftovers.sort_by(|a, b| a.0.cmp(b.0));
    summaries.extend(leftovers.into_iter().map(|(name, spent)| {
        build_summary(name.to_string(), UNALLOCATED_COLOR.to_string(), 0.0, spent)
    }));

    summaries
}

fn build_summary(name: String, color: String, budgeted: f64, spent: f64) -> CategorySummary {
    CategorySummary {
        name,
        color,
        budgeted,
        spent,
        remaining: budgeted - spent,
        percent_used: percent_used(spent, budgeted),
        status: BudgetStatus::classify(spent, budgeted),
    }
}

/// Totals across all categories.
#[must_use]
pub fn budget_totals(total_budget: f64, summaries: &[CategorySummary]) -> BudgetTotals {
    let total_spent: f64 = summaries.iter().map(|s| s.spent).sum();
    BudgetTotals {
        total_budget,
        total_spent,
        total_remaining: total_budget - total_spent,
        percent_used: percent_used(total_spent, total_budget),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::date;

    fn expense(id: i64, category: &str, amount: f64) -> group_expense::Model {
        group_expense::Model {
            id,
            group_id: 1,
            category: category.to_string(),
            amount,
            description: "test".to_string(),
            paid_by_id: "alice".to_string(),
            paid_by_name: "Alice".to_string(),
            date: date(2026, 6, 1),
            receipt_url: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn allocation(name: &str, budgeted: f64) -> category_allocation::Model {
        category_allocation::Model {
            id: 0,
            group_id: 1,
            name: name.to_string(),
            budgeted,
            color: "#000000".to_string(),
            is_locked: false,
        }
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(BudgetStatus::classify(50.0, 100.0), BudgetStatus::UnderBudget);
        assert_eq!(BudgetStatus::classify(90.0, 100.0), BudgetStatus::UnderBudget);
        assert_eq!(BudgetStatus::classify(95.0, 100.0), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::classify(100.0, 100.0), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::classify(100.5, 100.0), BudgetStatus::OverBudget);
        assert_eq!(BudgetStatus::classify(0.0, 0.0), BudgetStatus::UnderBudget);
        assert_eq!(BudgetStatus::classify(5.0, 0.0), BudgetStatus::OverBudget);
    }

    #[test]
    fn test_percent_used_edge_cases() {
        assert_eq!(percent_used(25.0, 100.0), 25.0);
        assert_eq!(percent_used(0.0, 0.0), 0.0);
        assert_eq!(percent_used(10.0, 0.0), 100.0);
    }

    #[test]
    fn test_summarize_categories() {
        let expenses = vec![
            expense(1, "Food", 30.0),
            expense(2, "Food", 45.5),
            expense(3, "Lodging", 600.0),
            expense(4, "Souvenirs", 12.0),
        ];
        let allocations = vec![allocation("Food", 400.0), allocation("Lodging", 550.0)];

        let summaries = summarize_categories(&expenses, &allocations);
        assert_eq!(summaries.len(), 3);

        assert_eq!(summaries[0].name, "Food");
        assert_eq!(summaries[0].spent, 75.5);
        assert_eq!(summaries[0].remaining, 324.5);
        assert_eq!(summaries[0].status, BudgetStatus::UnderBudget);

        assert_eq!(summaries[1].name, "Lodging");
        assert_eq!(summaries[1].status, BudgetStatus::OverBudget);

        assert_eq!(summaries[2].name, "Souvenirs");
        assert_eq!(summaries[2].budgeted, 0.0);
        assert_eq!(summaries[2].status, BudgetStatus::OverBudget);
    }

    #[test]
    fn test_category_spent_sums_to_total_spent() {
        let amounts = [12.34, 0.01, 99.99, 250.0, 3.33, 7.77, 41.0];
        let categories = ["Food", "Lodging", "Transport", "Food", "Misc", "Transport", "Fun"];
        let expenses: Vec<_> = amounts
            .iter()
            .zip(categories.iter())
            .enumerate()
            .map(|(i, (amount, category))| expense(i64::try_from(i).unwrap_or(0), category, *amount))
            .collect();
        let allocations = vec![allocation("Food", 300.0), allocation("Transport", 100.0)];

        let summaries = summarize_categories(&expenses, &allocations);
        let totals = budget_totals(400.0, &summaries);
        let direct_total: f64 = amounts.iter().sum();

        assert!((totals.total_spent - direct_total).abs() < 1e-9);
        assert!((totals.total_remaining - (400.0 - direct_total)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_inputs() {
        let summaries = summarize_categories(&Vec::<group_expense::Model>::new(), &[]);
        assert!(summaries.is_empty());
        let totals = budget_totals(0.0, &summaries);
        assert_eq!(totals.total_spent, 0.0);
        assert_eq!(totals.percent_used, 0.0);
    }
}
