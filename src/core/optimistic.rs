//! Optimistic view state - apply a change locally, persist it, roll back on failure.
//!
//! [`Optimistic`] is the generic mechanism: it applies the local mutation right
//! away so readers see it immediately, then awaits the remote write. If the
//! write fails only that mutation is undone, so changes other writers or
//! reloads made in the meantime survive, and the error is returned to the
//! caller to surface.
//!
//! [`GroupDashboard`] is the concrete state of one group's budget page, kept in
//! sync by optimistic mutations and by reloading on [`ChangeEvent`]s.

use crate::{
    core::{
        aggregation::{self, BudgetTotals, CategorySummary},
        budget,
        expense::{self, ExpenseWithSplits, NewExpense},
        group,
        realtime::{ChangeEvent, ChangeKind, Subscription},
        settlement::{self, MemberSummary},
    },
    entities::{category_allocation, group_expense, group_member},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Shared state that supports optimistic mutation with rollback.
#[derive(Debug)]
pub struct Optimistic<T> {
    state: Arc<RwLock<T>>,
}

impl<T> Clone for Optimistic<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Optimistic<T>
where
    T: Clone + Send + Sync,
{
    /// Wraps an initial state.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }

    /// Replaces the whole state.
    pub async fn replace(&self, value: T) {
        *self.state.write().await = value;
    }

    /// Applies `local` immediately, then awaits `remote`.
    ///
    /// `local` returns whatever `rollback` needs to undo it. On success
    /// `reconcile` patches the state with the persisted value; on failure
    /// `rollback` reverts just this mutation.
    ///
    /// # Errors
    /// Returns whatever error `remote` produced, after rolling back.
    pub async fn apply<L, U, F, R, C, B>(
        &self,
        local: L,
        remote: F,
        reconcile: C,
        rollback: B,
    ) -> Result<R>
    where
        L: FnOnce(&mut T) -> U,
        F: Future<Output = Result<R>>,
        C: FnOnce(&mut T, &R),
        B: FnOnce(&mut T, U),
    {
        let undo = local(&mut *self.state.write().await);

        match remote.await {
            Ok(value) => {
                reconcile(&mut *self.state.write().await, &value);
                Ok(value)
            }
            Err(e) => {
                warn!("Remote write failed, rolling back optimistic change: {}", e);
                rollback(&mut *self.state.write().await, undo);
                Err(e)
            }
        }
    }
}

/// Everything the budget page of one group shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Total budget
    pub total_budget: f64,
    /// Category allocations
    pub allocations: Vec<category_allocation::Model>,
    /// Expenses, newest first; optimistic placeholders have negative IDs
    pub expenses: Vec<ExpenseWithSplits>,
    /// Group members
    pub members: Vec<group_member::Model>,
}

impl DashboardState {
    /// Per-category summaries of the current state.
    #[must_use]
    pub fn category_summaries(&self) -> Vec<CategorySummary> {
        aggregation::summarize_categories(
            self.expenses.iter().map(|e| &e.expense),
            &self.allocations,
        )
    }

    /// Totals of the current state.
    #[must_use]
    pub fn totals(&self) -> BudgetTotals {
        aggregation::budget_totals(self.total_budget, &self.category_summaries())
    }

    /// Member settlement summaries of the current state.
    #[must_use]
    pub fn member_summaries(&self) -> Vec<MemberSummary> {
        settlement::compute_member_summaries(&self.members, &self.expenses)
    }
}

/// Live view of one group, mutated optimistically.
#[derive(Debug)]
pub struct GroupDashboard {
    db: DatabaseConnection,
    group_id: i64,
    view: Optimistic<DashboardState>,
    next_temp_id: AtomicI64,
}

impl GroupDashboard {
    /// Loads the dashboard of a group.
    ///
    /// # Errors
    /// Returns `Error::GroupNotFound` if the group doesn't exist.
    pub async fn load(db: DatabaseConnection, group_id: i64) -> Result<Self> {
        group::require_group(&db, group_id).await?;
        let state = load_state(&db, group_id).await?;
        Ok(Self {
            db,
            group_id,
            view: Optimistic::new(state),
            next_temp_id: AtomicI64::new(-1),
        })
    }

    /// Group this dashboard shows.
    #[must_use]
    pub const fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Current state, including pending optimistic changes.
    pub async fn state(&self) -> DashboardState {
        self.view.snapshot().await
    }

    /// Reloads everything from the database.
    pub async fn refresh(&self) -> Result<()> {
        let state = load_state(&self.db, self.group_id).await?;
        self.view.replace(state).await;
        debug!("Dashboard for group {} refreshed", self.group_id);
        Ok(())
    }

    /// Reloads the part of the state a change event refers to.
    pub async fn apply_change(&self, event: ChangeEvent) -> Result<()> {
        if event.group_id != self.group_id {
            return Ok(());
        }
        match event.kind {
            ChangeKind::Budget | ChangeKind::FinalizedPlan => {
                let view = budget::get_budget(&self.db, self.group_id).await?;
                let mut state = self.view.snapshot().await;
                state.total_budget = view.total_budget;
                state.allocations = view.allocations;
                self.view.replace(state).await;
            }
            ChangeKind::Expenses => {
                let expenses = expense::list_expenses(&self.db, self.group_id).await?;
                let mut state = self.view.snapshot().await;
                state.expenses = expenses;
                self.view.replace(state).await;
            }
            ChangeKind::Members => {
                let members = group::list_members(&self.db, self.group_id).await?;
                let mut state = self.view.snapshot().await;
                state.members = members;
                self.view.replace(state).await;
            }
        }
        Ok(())
    }

    /// Applies change events until the feed closes.
    ///
    /// A failed reload is logged and the loop keeps following the feed.
    pub async fn follow(&self, mut subscription: Subscription) {
        while let Some(event) = subscription.recv().await {
            if let Err(e) = self.apply_change(event).await {
                warn!(
                    "Failed to apply {:?} change to dashboard of group {}: {}",
                    event.kind, self.group_id, e
                );
            }
        }
        info!("Change feed closed for dashboard of group {}", self.group_id);
    }

    /// Shows the expense immediately, then persists it.
    ///
    /// The placeholder gets a negative ID that is replaced by the stored row on
    /// success; on failure it disappears again.
    ///
    /// # Errors
    /// Returns the error from [`expense::add_expense`] after rolling back.
    pub async fn add_expense_optimistic(
        &self,
        payer_id: &str,
        new_expense: NewExpense,
    ) -> Result<ExpenseWithSplits> {
        let temp_id = self.next_temp_id.fetch_sub(1, Ordering::Relaxed);
        let placeholder_input = new_expense.clone();
        let payer = payer_id.to_string();

        self.view
            .apply(
                |state| {
                    let paid_by_name = state
                        .members
                        .iter()
                        .find(|m| m.user_id == payer)
                        .map_or_else(|| payer.clone(), |m| m.display_name.clone());
                    let split_between = if placeholder_input.split_between.is_empty() {
                        state.members.iter().map(|m| m.user_id.clone()).collect()
                    } else {
                        placeholder_input.split_between.clone()
                    };
                    state.expenses.insert(
                        0,
                        ExpenseWithSplits {
                            expense: group_expense::Model {
                                id: temp_id,
                                group_id: self.group_id,
                                category: placeholder_input.category.clone(),
                                amount: placeholder_input.amount,
                                description: placeholder_input.description.clone(),
                                paid_by_id: payer.clone(),
                                paid_by_name,
                                date: placeholder_input.date,
                                receipt_url: placeholder_input.receipt_url.clone(),
                                created_at: chrono::Utc::now(),
                            },
                            split_between,
                        },
                    );
                },
                expense::add_expense(&self.db, self.group_id, payer_id, new_expense),
                |state, stored| {
                    if let Some(slot) = state
                        .expenses
                        .iter_mut()
                        .find(|e| e.expense.id == temp_id)
                    {
                        *slot = stored.clone();
                    }
                },
                |state, ()| state.expenses.retain(|e| e.expense.id != temp_id),
            )
            .await
    }

    /// Flips the lock flag immediately, then persists it.
    ///
    /// # Errors
    /// Returns the error from [`budget::set_category_lock`] after rolling back.
    pub async fn lock_category_optimistic(
        &self,
        actor_id: &str,
        category: &str,
        locked: bool,
    ) -> Result<category_allocation::Model> {
        self.view
            .apply(
                |state| {
                    state
                        .allocations
                        .iter_mut()
                        .find(|a| a.name == category)
                        .map(|a| std::mem::replace(&mut a.is_locked, locked))
                },
                budget::set_category_lock(&self.db, self.group_id, actor_id, category, locked),
                |state, stored| {
                    if let Some(a) = state.allocations.iter_mut().find(|a| a.id == stored.id) {
                        *a = stored.clone();
                    }
                },
                |state, previous| {
                    let target = state.allocations.iter_mut().find(|a| a.name == category);
                    if let (Some(previous), Some(a)) = (previous, target) {
                        a.is_locked = previous;
                    }
                },
            )
            .await
    }

    /// Shows new budget shares immediately, then persists them.
    ///
    /// # Errors
    /// Returns the error from [`group::update_budget_shares`] after rolling back.
    pub async fn update_shares_optimistic(
        &self,
        actor_id: &str,
        shares: HashMap<String, f64>,
    ) -> Result<Vec<group_member::Model>> {
        self.view
            .apply(
                |state| {
                    let mut previous = HashMap::new();
                    for member in &mut state.members {
                        if let Some(share) = shares.get(&member.user_id) {
                            previous.insert(member.id, (member.budget_share, member.wallet_balance));
                            member.wallet_balance += share - member.budget_share;
                            member.budget_share = *share;
                        }
                    }
                    previous
                },
                group::update_budget_shares(&self.db, self.group_id, actor_id, &shares),
                |state, stored| {
                    for updated in stored {
                        if let Some(m) = state.members.iter_mut().find(|m| m.id == updated.id) {
                            *m = updated.clone();
                        }
                    }
                },
                |state, previous| {
                    for member in &mut state.members {
                        if let Some((share, wallet)) = previous.get(&member.id) {
                            member.budget_share = *share;
                            member.wallet_balance = *wallet;
                        }
                    }
                },
            )
            .await
    }
}

async fn load_state(db: &DatabaseConnection, group_id: i64) -> Result<DashboardState> {
    let view = budget::get_budget(db, group_id).await?;
    Ok(DashboardState {
        total_budget: view.total_budget,
        allocations: view.allocations,
        expenses: expense::list_expenses(db, group_id).await?,
        members: group::list_members(db, group_id).await?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::realtime::ChangeFeed;
    use crate::errors::Error;
    use crate::test_utils::*;

    fn offline() -> Error {
        Error::Config {
            message: "offline".to_string(),
        }
    }

    #[tokio::test]
    async fn test_optimistic_rollback_undoes_change() {
        let view = Optimistic::new(vec![1, 2, 3]);

        let result: Result<()> = view
            .apply(
                |v| v.push(4),
                async { Err(offline()) },
                |_, _| {},
                |v, ()| v.retain(|x| *x != 4),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(view.snapshot().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_change_keeps_concurrent_success() {
        let view = Optimistic::new(Vec::<i32>::new());
        let other = view.clone();
        let (release, held) = tokio::sync::oneshot::channel::<()>();

        let slow = view.apply(
            |v| v.push(1),
            async {
                let _ = held.await;
                Err::<(), _>(offline())
            },
            |_, _| {},
            |v, ()| v.retain(|x| *x != 1),
        );
        let fast = async {
            let result = other
                .apply(
                    |v| v.push(2),
                    async { Ok(()) },
                    |_, _| {},
                    |v, ()| v.retain(|x| *x != 2),
                )
                .await;
            let _ = release.send(());
            result
        };

        // The slow write fails after the fast one committed
        let (slow, fast) = tokio::join!(slow, fast);
        assert!(slow.is_err());
        assert!(fast.is_ok());
        assert_eq!(view.snapshot().await, vec![2]);
    }

    #[tokio::test]
    async fn test_optimistic_change_visible_before_remote_completes() {
        let view = Optimistic::new(0_i32);
        let observer = view.clone();

        let value = view
            .apply(
                |v| *v = 5,
                async { Ok(observer.snapshot().await) },
                |v, seen| *v += *seen,
                |_, ()| {},
            )
            .await
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(view.snapshot().await, 10);
    }

    #[tokio::test]
    async fn test_failed_expense_is_removed_from_view() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        budget::lock_category(&db, group.id, LEADER, "Lodging").await?;
        let dashboard = GroupDashboard::load(db, group.id).await?;

        let result = dashboard
            .add_expense_optimistic(ALICE, new_expense("Lodging", 120.0))
            .await;
        assert!(matches!(result.unwrap_err(), Error::CategoryLocked { .. }));
        assert!(dashboard.state().await.expenses.is_empty());

        let result = dashboard
            .add_expense_optimistic(ALICE, new_expense("Nope", 5.0))
            .await;
        assert!(result.is_err());
        assert!(dashboard.state().await.expenses.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_successful_expense_replaces_placeholder() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let dashboard = GroupDashboard::load(db, group.id).await?;

        let stored = dashboard
            .add_expense_optimistic(BOB, new_expense("Food", 60.0))
            .await?;

        let state = dashboard.state().await;
        assert_eq!(state.expenses.len(), 1);
        assert_eq!(state.expenses[0], stored);
        assert!(stored.expense.id > 0);
        assert_eq!(state.totals().total_spent, 60.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_and_share_rollbacks() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let dashboard = GroupDashboard::load(db, group.id).await?;

        // Non-leader lock attempt is rolled back
        let result = dashboard.lock_category_optimistic(BOB, "Food", true).await;
        assert!(result.is_err());
        let state = dashboard.state().await;
        assert!(state.allocations.iter().all(|a| !a.is_locked));

        // Leader lock persists
        dashboard
            .lock_category_optimistic(LEADER, "Food", true)
            .await?;
        let state = dashboard.state().await;
        assert!(state.allocations.iter().any(|a| a.name == "Food" && a.is_locked));

        // Invalid share rolled back
        let shares = HashMap::from([(ALICE.to_string(), -1.0)]);
        assert!(dashboard.update_shares_optimistic(LEADER, shares).await.is_err());
        let state = dashboard.state().await;
        assert!(state.members.iter().all(|m| m.budget_share == 0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_change_reloads_expenses() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let dashboard = GroupDashboard::load(db.clone(), group.id).await?;
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(group.id);

        create_test_expense(&db, group.id, ALICE, "Food", 25.0).await?;
        feed.notify(group.id, ChangeKind::Expenses);

        let event = sub.recv().await.unwrap();
        dashboard.apply_change(event).await?;
        assert_eq!(dashboard.state().await.expenses.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_follow_applies_until_feed_closes() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let dashboard = GroupDashboard::load(db.clone(), group.id).await?;
        let feed = ChangeFeed::default();
        let sub = feed.subscribe(group.id);

        create_test_expense(&db, group.id, ALICE, "Food", 25.0).await?;
        create_test_expense(&db, group.id, BOB, "Lodging", 60.0).await?;
        feed.notify(group.id + 1, ChangeKind::Expenses);
        feed.notify(group.id, ChangeKind::Expenses);
        drop(feed);

        // Returns once the buffered events are applied and the sender is gone
        dashboard.follow(sub).await;
        assert_eq!(dashboard.state().await.expenses.len(), 2);
        Ok(())
    }
}
