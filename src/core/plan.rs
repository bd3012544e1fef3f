//! Finalized plan business logic - Proposals, approvals and locking.
//!
//! The leader proposes a plan (total budget, per-category budgets and optionally
//! an itinerary). Members vote; once a strict majority of the group approves,
//! the plan is locked and, if requested, copied into the group budget within the
//! same database transaction as the final vote.

use crate::{
    core::{
        budget::{self, AllocationInput, GroupBudgetView},
        group,
        itinerary::AiTripPlanData,
        settlement::round2,
    },
    entities::{FinalizedPlan, PlanApproval, finalized_plan, plan_approval},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

/// Lifecycle of a finalized plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// Collecting votes
    Pending,
    /// Approved by a majority, no longer votable
    Locked,
}

impl PlanStatus {
    /// Value stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Locked => "locked",
        }
    }
}

impl FromStr for PlanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "locked" => Ok(Self::Locked),
            other => Err(Error::Config {
                message: format!("Unknown plan status '{other}'"),
            }),
        }
    }
}

/// What the leader puts up for a vote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanProposal {
    /// Total budget
    pub total_budget: f64,
    /// Budget per category
    pub category_budgets: BTreeMap<String, f64>,
    /// Itinerary the budget was derived from
    pub itinerary: Option<AiTripPlanData>,
    /// Copy the budget into the group budget once locked
    pub sync_to_budget: bool,
}

impl PlanProposal {
    /// Builds a proposal from an itinerary's cost breakdown.
    ///
    /// Each non-zero area becomes a category; the total is their sum.
    ///
    /// # Errors
    /// Returns `Error::Itinerary` if the breakdown has no costs.
    pub fn from_itinerary(itinerary: AiTripPlanData, sync_to_budget: bool) -> Result<Self> {
        let breakdown = &itinerary.cost_breakdown;
        let category_budgets: BTreeMap<String, f64> = [
            ("Accommodation", breakdown.accommodation),
            ("Food", breakdown.food),
            ("Activities", breakdown.activities),
            ("Transport", breakdown.transport),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(name, amount)| (name.to_string(), round2(amount)))
        .collect();

        if category_budgets.is_empty() {
            return Err(Error::Itinerary {
                message: "The plan has no cost breakdown to budget from".to_string(),
            });
        }

        Ok(Self {
            total_budget: category_budgets.values().sum(),
            category_budgets,
            itinerary: Some(itinerary),
            sync_to_budget,
        })
    }

    /// Builds a proposal that freezes the group's current budget.
    #[must_use]
    pub fn from_budget(view: &GroupBudgetView) -> Self {
        Self {
            total_budget: view.total_budget,
            category_budgets: view
                .allocations
                .iter()
                .map(|a| (a.name.clone(), a.budgeted))
                .collect(),
            itinerary: None,
            sync_to_budget: false,
        }
    }

    fn allocation_inputs(&self) -> Vec<AllocationInput> {
        category_inputs(&self.category_budgets)
    }
}

fn category_inputs(category_budgets: &BTreeMap<String, f64>) -> Vec<AllocationInput> {
    category_budgets
        .iter()
        .map(|(name, budgeted)| AllocationInput {
            name: name.clone(),
            budgeted: *budgeted,
            color: None,
        })
        .collect()
}

/// A plan together with its votes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanState {
    /// Stored plan
    pub plan: finalized_plan::Model,
    /// Current members that approved, in voting order
    pub approvals: Vec<String>,
    /// Current size of the group
    pub member_count: usize,
    /// Parsed status
    pub status: PlanStatus,
}

impl PlanState {
    /// Approvals needed to lock the plan.
    #[must_use]
    pub const fn approvals_required(&self) -> usize {
        approvals_required(self.member_count)
    }

    /// Whether `user_id` already voted.
    #[must_use]
    pub fn has_approved(&self, user_id: &str) -> bool {
        self.approvals.iter().any(|a| a == user_id)
    }

    /// Decoded category budgets.
    ///
    /// # Errors
    /// Returns `Error::Json` if the stored JSON is malformed.
    pub fn category_budgets(&self) -> Result<BTreeMap<String, f64>> {
        Ok(serde_json::from_str(&self.plan.category_budgets)?)
    }

    /// Decoded itinerary, if the plan carries one.
    ///
    /// # Errors
    /// Returns `Error::Json` if the stored JSON is malformed.
    pub fn itinerary(&self) -> Result<Option<AiTripPlanData>> {
        self.plan
            .itinerary
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Error::from)
    }
}

/// Strict majority of `member_count`.
#[must_use]
pub const fn approvals_required(member_count: usize) -> usize {
    member_count / 2 + 1
}

/// Puts a plan up for a vote, replacing any pending plan of the group.
///
/// # Errors
/// Returns an error if:
/// - The group doesn't exist or the actor is not its leader
/// - The category budgets don't add up to the total (see [`budget::validate_allocations`])
/// - Any database write fails
pub async fn propose_plan(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    proposal: PlanProposal,
) -> Result<PlanState> {
    let group = group::require_group(db, group_id).await?;
    if !group::is_leader(&group, actor_id) {
        return Err(Error::PermissionDenied {
            reason: "Only the group leader can propose a plan".to_string(),
        });
    }

    budget::validate_allocations(proposal.total_budget, &proposal.allocation_inputs())?;

    let category_json = serde_json::to_string(&proposal.category_budgets)?;
    let itinerary_json = proposal
        .itinerary
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let txn = db.begin().await?;

    let stale: Vec<i64> = FinalizedPlan::find()
        .filter(finalized_plan::Column::GroupId.eq(group_id))
        .filter(finalized_plan::Column::Status.eq(PlanStatus::Pending.as_str()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if !stale.is_empty() {
        PlanApproval::delete_many()
            .filter(plan_approval::Column::PlanId.is_in(stale.iter().copied()))
            .exec(&txn)
            .await?;
        FinalizedPlan::delete_many()
            .filter(finalized_plan::Column::Id.is_in(stale.iter().copied()))
            .exec(&txn)
            .await?;
        debug!("Replaced {} pending plan(s) in group {}", stale.len(), group_id);
    }

    let plan = finalized_plan::ActiveModel {
        group_id: Set(group_id),
        total_budget: Set(proposal.total_budget),
        category_budgets: Set(category_json),
        itinerary: Set(itinerary_json),
        status: Set(PlanStatus::Pending.as_str().to_string()),
        sync_to_budget: Set(proposal.sync_to_budget),
        created_at: Set(chrono::Utc::now()),
        locked_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        "Plan {} proposed in group {} with total {:.2}",
        plan.id, group_id, plan.total_budget
    );

    build_state(db, plan).await
}

/// Records `user_id`'s approval and locks the plan once a majority agrees.
///
/// Voting twice has no further effect.
///
/// # Errors
/// Returns an error if:
/// - The plan doesn't exist
/// - The plan is already locked (`Error::PlanLocked`)
/// - The user is not a member of the plan's group (`Error::NotMember`)
/// - Syncing to the group budget fails; the final vote is rolled back then
pub async fn approve_plan(
    db: &DatabaseConnection,
    plan_id: i64,
    user_id: &str,
) -> Result<PlanState> {
    let txn = db.begin().await?;

    // Read inside the transaction so a concurrent final vote sees the lock
    let plan = FinalizedPlan::find_by_id(plan_id)
        .one(&txn)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;

    if plan.status.parse::<PlanStatus>()? == PlanStatus::Locked {
        return Err(Error::PlanLocked { id: plan_id });
    }

    group::require_member(&txn, plan.group_id, user_id).await?;

    let already_voted = PlanApproval::find()
        .filter(plan_approval::Column::PlanId.eq(plan_id))
        .filter(plan_approval::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .is_some();

    if already_voted {
        debug!("User {} already approved plan {}", user_id, plan_id);
    } else {
        plan_approval::ActiveModel {
            plan_id: Set(plan_id),
            user_id: Set(user_id.to_string()),
            approved_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let (approvals, member_count) = current_approvals(&txn, &plan).await?;

    let plan = if approvals.len() >= approvals_required(member_count) {
        let sync = plan.sync_to_budget;
        let group_id = plan.group_id;
        let total = plan.total_budget;
        let category_budgets: BTreeMap<String, f64> =
            serde_json::from_str(&plan.category_budgets)?;

        let mut active: finalized_plan::ActiveModel = plan.into();
        active.status = Set(PlanStatus::Locked.as_str().to_string());
        active.locked_at = Set(Some(chrono::Utc::now()));
        let locked = active.update(&txn).await?;

        if sync {
            budget::write_allocations(&txn, group_id, total, &category_inputs(&category_budgets))
                .await?;
        }

        info!(
            "Plan {} locked in group {} with {}/{} approvals{}",
            plan_id,
            group_id,
            approvals.len(),
            member_count,
            if sync { ", budget synced" } else { "" }
        );
        locked
    } else {
        plan
    };

    txn.commit().await?;
    build_state(db, plan).await
}

/// Loads a plan with its votes.
///
/// # Errors
/// Returns `Error::PlanNotFound` if the plan doesn't exist.
pub async fn get_plan_state(db: &DatabaseConnection, plan_id: i64) -> Result<PlanState> {
    let plan = FinalizedPlan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;
    build_state(db, plan).await
}

/// The most recently proposed plan of a group, if any.
pub async fn current_plan_for_group(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Option<PlanState>> {
    let latest = FinalizedPlan::find()
        .filter(finalized_plan::Column::GroupId.eq(group_id))
        .order_by_desc(finalized_plan::Column::CreatedAt)
        .order_by_desc(finalized_plan::Column::Id)
        .one(db)
        .await?;

    match latest {
        Some(plan) => Ok(Some(build_state(db, plan).await?)),
        None => Ok(None),
    }
}

/// Approvals cast by users who are still in the group, in voting order, and
/// the current group size.
async fn current_approvals<C>(db: &C, plan: &finalized_plan::Model) -> Result<(Vec<String>, usize)>
where
    C: ConnectionTrait,
{
    let members: HashSet<String> = group::list_members(db, plan.group_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();

    let approvals = PlanApproval::find()
        .filter(plan_approval::Column::PlanId.eq(plan.id))
        .order_by_asc(plan_approval::Column::ApprovedAt)
        .order_by_asc(plan_approval::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.user_id)
        .filter(|user_id| members.contains(user_id))
        .collect();

    Ok((approvals, members.len()))
}

async fn build_state(db: &DatabaseConnection, plan: finalized_plan::Model) -> Result<PlanState> {
    let (approvals, member_count) = current_approvals(db, &plan).await?;
    let status = plan.status.parse()?;

    Ok(PlanState {
        plan,
        approvals,
        member_count,
        status,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::itinerary::CostBreakdown;
    use crate::test_utils::*;

    fn proposal(sync: bool) -> PlanProposal {
        PlanProposal {
            total_budget: 1500.0,
            category_budgets: BTreeMap::from([
                ("Food".to_string(), 500.0),
                ("Lodging".to_string(), 700.0),
                ("Transport".to_string(), 300.0),
            ]),
            itinerary: None,
            sync_to_budget: sync,
        }
    }

    #[test]
    fn test_approvals_required_is_strict_majority() {
        assert_eq!(approvals_required(1), 1);
        assert_eq!(approvals_required(2), 2);
        assert_eq!(approvals_required(3), 2);
        assert_eq!(approvals_required(4), 3);
        assert_eq!(approvals_required(5), 3);
    }

    #[test]
    fn test_proposal_from_itinerary() {
        let itinerary = AiTripPlanData {
            cost_breakdown: CostBreakdown {
                accommodation: 600.0,
                food: 250.0,
                activities: 0.0,
                transport: 150.0,
                total: 1000.0,
            },
            ..Default::default()
        };

        let proposal = PlanProposal::from_itinerary(itinerary, true).unwrap();
        assert_eq!(proposal.category_budgets.len(), 3);
        assert!(!proposal.category_budgets.contains_key("Activities"));
        assert_eq!(proposal.total_budget, 1000.0);
        assert!(proposal.sync_to_budget);

        assert!(PlanProposal::from_itinerary(AiTripPlanData::default(), false).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("locked".parse::<PlanStatus>().unwrap(), PlanStatus::Locked);
        assert_eq!(PlanStatus::Pending.as_str(), "pending");
        assert!("approved".parse::<PlanStatus>().is_err());
    }

    #[tokio::test]
    async fn test_only_leader_can_propose() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let result = propose_plan(&db, group.id, ALICE, proposal(false)).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_proposal_must_balance() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let mut unbalanced = proposal(false);
        unbalanced.total_budget = 2000.0;

        let result = propose_plan(&db, group.id, LEADER, unbalanced).await;
        assert!(matches!(result.unwrap_err(), Error::AllocationMismatch { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_majority_locks_and_syncs_budget() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        budget::lock_category(&db, group.id, LEADER, "Food").await?;

        let state = propose_plan(&db, group.id, LEADER, proposal(true)).await?;
        assert_eq!(state.status, PlanStatus::Pending);
        assert_eq!(state.approvals_required(), 2);

        let state = approve_plan(&db, state.plan.id, ALICE).await?;
        assert_eq!(state.status, PlanStatus::Pending);

        // Second vote from the same member changes nothing
        let state = approve_plan(&db, state.plan.id, ALICE).await?;
        assert_eq!(state.approvals, vec![ALICE.to_string()]);
        assert_eq!(state.status, PlanStatus::Pending);

        let state = approve_plan(&db, state.plan.id, BOB).await?;
        assert_eq!(state.status, PlanStatus::Locked);
        assert!(state.plan.locked_at.is_some());

        let view = budget::get_budget(&db, group.id).await?;
        assert_eq!(view.total_budget, 1500.0);
        assert_eq!(view.allocations.len(), 3);
        assert_eq!(view.allocation("Transport").unwrap().budgeted, 300.0);
        assert!(view.allocation("Food").unwrap().is_locked);

        let result = approve_plan(&db, state.plan.id, LEADER).await;
        assert!(matches!(result.unwrap_err(), Error::PlanLocked { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_without_sync_leaves_budget() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let state = propose_plan(&db, group.id, LEADER, proposal(false)).await?;

        approve_plan(&db, state.plan.id, LEADER).await?;
        let state = approve_plan(&db, state.plan.id, BOB).await?;
        assert_eq!(state.status, PlanStatus::Locked);

        let view = budget::get_budget(&db, group.id).await?;
        assert_eq!(view.total_budget, 1000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_votes_of_departed_members_do_not_count() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let state = propose_plan(&db, group.id, LEADER, proposal(false)).await?;

        approve_plan(&db, state.plan.id, ALICE).await?;
        group::remove_member(&db, group.id, ALICE, ALICE).await?;

        let state = approve_plan(&db, state.plan.id, BOB).await?;
        assert_eq!(state.member_count, 2);
        assert_eq!(state.approvals, vec![BOB.to_string()]);
        assert_eq!(state.status, PlanStatus::Pending);

        let state = approve_plan(&db, state.plan.id, LEADER).await?;
        assert_eq!(state.status, PlanStatus::Locked);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_member_cannot_vote() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let state = propose_plan(&db, group.id, LEADER, proposal(false)).await?;

        let result = approve_plan(&db, state.plan.id, "mallory").await;
        assert!(matches!(result.unwrap_err(), Error::NotMember { .. }));

        let result = approve_plan(&db, 9999, ALICE).await;
        assert!(matches!(result.unwrap_err(), Error::PlanNotFound { id: 9999 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_new_proposal_replaces_pending() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        let first = propose_plan(&db, group.id, LEADER, proposal(false)).await?;
        approve_plan(&db, first.plan.id, ALICE).await?;

        let mut second_proposal = proposal(false);
        second_proposal.itinerary = Some(AiTripPlanData::default());
        let second = propose_plan(&db, group.id, LEADER, second_proposal).await?;

        assert!(matches!(
            get_plan_state(&db, first.plan.id).await.unwrap_err(),
            Error::PlanNotFound { .. }
        ));
        let current = current_plan_for_group(&db, group.id).await?.unwrap();
        assert_eq!(current.plan.id, second.plan.id);
        assert!(current.approvals.is_empty());
        assert_eq!(current.itinerary()?, Some(AiTripPlanData::default()));
        assert_eq!(current.category_budgets()?.len(), 3);
        Ok(())
    }
}
