//! Shared test utilities for `TripBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        budget::{self, AllocationInput},
        expense::{self, ExpenseWithSplits, NewExpense},
        group,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// User ID of the leader in test groups
pub const LEADER: &str = "leader";
/// User ID of the first regular member
pub const ALICE: &str = "alice";
/// User ID of the second regular member
pub const BOB: &str = "bob";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date.
///
/// # Panics
/// Panics on an impossible date; only used with literal test dates.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates a test group led by [`LEADER`] with sensible defaults.
///
/// # Defaults
/// * `destination`: "Lisbon"
/// * dates: 2026-06-01 to 2026-06-07
pub async fn create_test_group(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::trip_group::Model> {
    group::create_group(
        db,
        name.to_string(),
        "Lisbon".to_string(),
        date(2026, 6, 1),
        date(2026, 6, 7),
        LEADER.to_string(),
        "Lea".to_string(),
    )
    .await
}

/// Sets up a group with the leader plus [`ALICE`] and [`BOB`].
/// Returns (db, group) for common test scenarios.
pub async fn setup_group_with_members() -> Result<(DatabaseConnection, entities::trip_group::Model)>
{
    let db = setup_test_db().await?;
    let trip = create_test_group(&db, "Summer").await?;
    group::add_member(&db, trip.id, ALICE.to_string(), "Alice".to_string()).await?;
    group::add_member(&db, trip.id, BOB.to_string(), "Bob".to_string()).await?;
    Ok((db, trip))
}

/// Allocation input without an explicit color.
#[must_use]
pub fn allocation(name: &str, budgeted: f64) -> AllocationInput {
    AllocationInput {
        name: name.to_string(),
        budgeted,
        color: None,
    }
}

/// Saves a 1000.0 budget split into Food (400) and Lodging (600).
pub async fn create_test_budget(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<budget::GroupBudgetView> {
    budget::save_allocations(
        db,
        group_id,
        LEADER,
        1000.0,
        &[allocation("Food", 400.0), allocation("Lodging", 600.0)],
    )
    .await
}

/// Sets up a group with members and the default test budget.
pub async fn setup_group_with_budget() -> Result<(DatabaseConnection, entities::trip_group::Model)>
{
    let (db, trip) = setup_group_with_members().await?;
    create_test_budget(&db, trip.id).await?;
    Ok((db, trip))
}

/// Expense input split between everyone in the group.
#[must_use]
pub fn new_expense(category: &str, amount: f64) -> NewExpense {
    NewExpense {
        category: category.to_string(),
        amount,
        description: format!("{category} expense"),
        date: date(2026, 6, 2),
        receipt_url: None,
        split_between: Vec::new(),
    }
}

/// Logs an expense paid by `payer` and split between everyone.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    group_id: i64,
    payer: &str,
    category: &str,
    amount: f64,
) -> Result<ExpenseWithSplits> {
    expense::add_expense(db, group_id, payer, new_expense(category, amount)).await
}
