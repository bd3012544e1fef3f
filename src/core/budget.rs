//! Budget business logic - Handles the group budget, category allocations and locks.
//!
//! A save is only accepted when the category budgets add up to the total budget
//! (within [`ALLOCATION_TOLERANCE`]). Locked categories reject expenses from
//! everyone but the group leader.

use crate::{
    config::categories::Config as CategoryConfig,
    core::group,
    entities::{CategoryAllocation, GroupBudget, category_allocation, group_budget, trip_group},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Largest allowed difference between the total budget and the category sum.
pub const ALLOCATION_TOLERANCE: f64 = 0.01;

const PALETTE: [&str; 8] = [
    "#4f46e5", "#16a34a", "#0891b2", "#ea580c", "#db2777", "#ca8a04", "#7c3aed", "#64748b",
];

/// One category in a budget save request.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationInput {
    /// Category name
    pub name: String,
    /// Amount budgeted
    pub budgeted: f64,
    /// Display color; existing or palette color is used when `None`
    pub color: Option<String>,
}

/// A group's budget as the rest of the app sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupBudgetView {
    /// Group the budget belongs to
    pub group_id: i64,
    /// Total budget (0.0 when never saved)
    pub total_budget: f64,
    /// Category allocations ordered by name
    pub allocations: Vec<category_allocation::Model>,
}

impl GroupBudgetView {
    /// Category name to (budgeted, color).
    #[must_use]
    pub fn category_allocations(&self) -> BTreeMap<String, (f64, String)> {
        self.allocations
            .iter()
            .map(|a| (a.name.clone(), (a.budgeted, a.color.clone())))
            .collect()
    }

    /// Names of the locked categories.
    #[must_use]
    pub fn locked_categories(&self) -> BTreeSet<String> {
        self.allocations
            .iter()
            .filter(|a| a.is_locked)
            .map(|a| a.name.clone())
            .collect()
    }

    /// Finds an allocation by name.
    #[must_use]
    pub fn allocation(&self, name: &str) -> Option<&category_allocation::Model> {
        self.allocations.iter().find(|a| a.name == name)
    }
}

/// Returns true if `user_id` may log an expense against `allocation`.
#[must_use]
pub fn can_submit_to_category(
    group: &trip_group::Model,
    allocation: &category_allocation::Model,
    user_id: &str,
) -> bool {
    !allocation.is_locked || group::is_leader(group, user_id)
}

/// Validates a budget save request and returns the category sum.
///
/// # Errors
/// Returns an error if:
/// - The total or any category amount is negative or not finite
/// - A category name is empty or repeated
/// - The category sum differs from the total by more than [`ALLOCATION_TOLERANCE`]
pub fn validate_allocations(total: f64, allocations: &[AllocationInput]) -> Result<f64> {
    if !total.is_finite() || total < 0.0 {
        return Err(Error::InvalidAmount { amount: total });
    }

    let mut seen = HashSet::new();
    for input in allocations {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Config {
                message: "Category name cannot be empty".to_string(),
            });
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(Error::Config {
                message: format!("Category '{name}' is listed twice"),
            });
        }
        if !input.budgeted.is_finite() || input.budgeted < 0.0 {
            return Err(Error::InvalidAmount {
                amount: input.budgeted,
            });
        }
    }

    let allocated: f64 = allocations.iter().map(|a| a.budgeted).sum();
    if (allocated - total).abs() > ALLOCATION_TOLERANCE {
        return Err(Error::AllocationMismatch { total, allocated });
    }

    Ok(allocated)
}

/// Splits `total` across the configured templates.
///
/// Amounts are rounded to cents; the last category absorbs the rounding
/// remainder so the result always passes [`validate_allocations`].
#[must_use]
pub fn allocations_from_templates(total: f64, templates: &CategoryConfig) -> Vec<AllocationInput> {
    let mut inputs: Vec<AllocationInput> = templates
        .categories
        .iter()
        .map(|t| AllocationInput {
            name: t.name.clone(),
            budgeted: crate::core::settlement::round2(total * t.share),
            color: Some(t.color.clone()),
        })
        .collect();

    let assigned: f64 = inputs.iter().map(|a| a.budgeted).sum();
    if let Some(last) = inputs.last_mut() {
        last.budgeted = crate::core::settlement::round2(last.budgeted + total - assigned);
    }
    inputs
}

/// Loads the budget of a group.
///
/// A group that never saved a budget gets a view with a zero total and no allocations.
pub async fn get_budget<C>(db: &C, group_id: i64) -> Result<GroupBudgetView>
where
    C: ConnectionTrait,
{
    let total_budget = GroupBudget::find()
        .filter(group_budget::Column::GroupId.eq(group_id))
        .one(db)
        .await?
        .map_or(0.0, |b| b.total_budget);

    let allocations = CategoryAllocation::find()
        .filter(category_allocation::Column::GroupId.eq(group_id))
        .order_by_asc(category_allocation::Column::Name)
        .all(db)
        .await?;

    debug!(
        "Loaded budget for group {}: total {:.2}, {} categories",
        group_id,
        total_budget,
        allocations.len()
    );

    Ok(GroupBudgetView {
        group_id,
        total_budget,
        allocations,
    })
}

/// Writes a validated budget without permission checks.
///
/// Runs on whatever connection it is given, so callers that already hold a
/// database transaction (plan locking) stay atomic. Lock flags of categories
/// that survive the save are preserved.
pub(crate) async fn write_allocations<C>(
    conn: &C,
    group_id: i64,
    total: f64,
    allocations: &[AllocationInput],
) -> Result<()>
where
    C: ConnectionTrait,
{
    validate_allocations(total, allocations)?;
    let now = chrono::Utc::now();

    match GroupBudget::find()
        .filter(group_budget::Column::GroupId.eq(group_id))
        .one(conn)
        .await?
    {
        Some(existing) => {
            let mut active: group_budget::ActiveModel = existing.into();
            active.total_budget = Set(total);
            active.updated_at = Set(now);
            active.update(conn).await?;
        }
        None => {
            group_budget::ActiveModel {
                group_id: Set(group_id),
                total_budget: Set(total),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }

    let previous: HashMap<String, category_allocation::Model> = CategoryAllocation::find()
        .filter(category_allocation::Column::GroupId.eq(group_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.name.clone(), a))
        .collect();

    CategoryAllocation::delete_many()
        .filter(category_allocation::Column::GroupId.eq(group_id))
        .exec(conn)
        .await?;

    for (index, input) in allocations.iter().enumerate() {
        let name = input.name.trim().to_string();
        let existing = previous.get(&name);
        let color = input
            .color
            .clone()
            .or_else(|| existing.map(|a| a.color.clone()))
            .unwrap_or_else(|| PALETTE[index % PALETTE.len()].to_string());

        category_allocation::ActiveModel {
            group_id: Set(group_id),
            name: Set(name),
            budgeted: Set(input.budgeted),
            color: Set(color),
            is_locked: Set(existing.is_some_and(|a| a.is_locked)),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

/// Saves the total budget and replaces the category allocations of a group.
///
/// # Errors
/// Returns an error if:
/// - The group doesn't exist or the actor is not its leader
/// - Validation fails (see [`validate_allocations`])
/// - Any database write fails; nothing is saved in that case
pub async fn save_allocations(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    total: f64,
    allocations: &[AllocationInput],
) -> Result<GroupBudgetView> {
    let group = group::require_group(db, group_id).await?;
    if !group::is_leader(&group, actor_id) {
        return Err(Error::PermissionDenied {
            reason: "Only the group leader can edit the budget".to_string(),
        });
    }

    let allocated = validate_allocations(total, allocations)?;

    let txn = db.begin().await?;
    write_allocations(&txn, group_id, total, allocations).await?;
    txn.commit().await?;

    info!(
        "Saved budget for group {}: total {:.2} across {} categories ({:.2} allocated)",
        group_id,
        total,
        allocations.len(),
        allocated
    );
    get_budget(db, group_id).await
}

/// Locks or unlocks a category.
///
/// # Errors
/// Returns `Error::PermissionDenied` if the actor is not the leader, or
/// `Error::CategoryNotFound` if the category is not allocated.
pub async fn set_category_lock(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    category: &str,
    locked: bool,
) -> Result<category_allocation::Model> {
    let group = group::require_group(db, group_id).await?;
    if !group::is_leader(&group, actor_id) {
        warn!(
            "User {} tried to change lock on '{}' in group {}",
            actor_id, category, group_id
        );
        return Err(Error::PermissionDenied {
            reason: "Only the group leader can lock or unlock categories".to_string(),
        });
    }

    let allocation = CategoryAllocation::find()
        .filter(category_allocation::Column::GroupId.eq(group_id))
        .filter(category_allocation::Column::Name.eq(category))
        .one(db)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category.to_string(),
        })?;

    let mut active: category_allocation::ActiveModel = allocation.into();
    active.is_locked = Set(locked);
    let updated = active.update(db).await?;

    info!(
        "Category '{}' in group {} is now {}",
        category,
        group_id,
        if locked { "locked" } else { "unlocked" }
    );
    Ok(updated)
}

/// Locks a category so only the leader can add expenses to it.
pub async fn lock_category(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    category: &str,
) -> Result<category_allocation::Model> {
    set_category_lock(db, group_id, actor_id, category, true).await
}

/// Unlocks a category for everyone.
pub async fn unlock_category(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    category: &str,
) -> Result<category_allocation::Model> {
    set_category_lock(db, group_id, actor_id, category, false).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_validate_allocations_tolerance() {
        let within = [allocation("Food", 333.33), allocation("Lodging", 666.66)];
        assert!(validate_allocations(1000.0, &within).is_ok());

        let outside = [allocation("Food", 333.0), allocation("Lodging", 666.0)];
        assert!(matches!(
            validate_allocations(1000.0, &outside).unwrap_err(),
            Error::AllocationMismatch { total: 1000.0, .. }
        ));
    }

    #[test]
    fn test_validate_allocations_rejects_bad_input() {
        let dup = [allocation("Food", 500.0), allocation("food", 500.0)];
        assert!(matches!(
            validate_allocations(1000.0, &dup).unwrap_err(),
            Error::Config { message: _ }
        ));

        let negative = [allocation("Food", -10.0), allocation("Lodging", 1010.0)];
        assert!(matches!(
            validate_allocations(1000.0, &negative).unwrap_err(),
            Error::InvalidAmount { amount: -10.0 }
        ));

        assert!(matches!(
            validate_allocations(f64::NAN, &[]).unwrap_err(),
            Error::InvalidAmount { amount: _ }
        ));

        // Empty budget with no categories is fine
        assert!(validate_allocations(0.0, &[]).is_ok());
    }

    #[test]
    fn test_allocations_from_templates_sum_exactly() {
        let templates = CategoryConfig::builtin();
        let inputs = allocations_from_templates(1234.57, &templates);
        assert_eq!(inputs.len(), templates.categories.len());
        assert!(validate_allocations(1234.57, &inputs).is_ok());
    }

    #[tokio::test]
    async fn test_save_and_get_budget() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;

        let view = create_test_budget(&db, group.id).await?;
        assert_eq!(view.total_budget, 1000.0);
        assert_eq!(view.allocations.len(), 2);

        let map = view.category_allocations();
        assert_eq!(map["Food"].0, 400.0);
        assert_eq!(map["Lodging"].0, 600.0);
        assert!(view.locked_categories().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_get_budget_for_new_group_is_empty() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let view = get_budget(&db, group.id).await?;
        assert_eq!(view.total_budget, 0.0);
        assert!(view.allocations.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_rejects_mismatch_and_keeps_old_budget() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;

        let result = save_allocations(
            &db,
            group.id,
            LEADER,
            1500.0,
            &[allocation("Food", 400.0), allocation("Lodging", 600.0)],
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AllocationMismatch {
                total: 1500.0,
                allocated: 1000.0
            }
        ));

        let view = get_budget(&db, group.id).await?;
        assert_eq!(view.total_budget, 1000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_only_leader_can_save() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let result = save_allocations(
            &db,
            group.id,
            ALICE,
            100.0,
            &[allocation("Food", 100.0)],
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_survives_resave() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        lock_category(&db, group.id, LEADER, "Food").await?;

        let view = save_allocations(
            &db,
            group.id,
            LEADER,
            1200.0,
            &[
                allocation("Food", 500.0),
                allocation("Lodging", 600.0),
                allocation("Fun", 100.0),
            ],
        )
        .await?;

        let locked = view.locked_categories();
        assert_eq!(locked.len(), 1);
        assert!(locked.contains("Food"));
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_and_unlock_category() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;

        let result = lock_category(&db, group.id, ALICE, "Food").await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        let result = lock_category(&db, group.id, LEADER, "Nope").await;
        assert!(matches!(result.unwrap_err(), Error::CategoryNotFound { .. }));

        let locked = lock_category(&db, group.id, LEADER, "Food").await?;
        assert!(locked.is_locked);
        assert!(!can_submit_to_category(&group, &locked, ALICE));
        assert!(can_submit_to_category(&group, &locked, LEADER));

        let unlocked = unlock_category(&db, group.id, LEADER, "Food").await?;
        assert!(can_submit_to_category(&group, &unlocked, ALICE));
        Ok(())
    }
}
