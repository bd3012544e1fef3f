//! Group business logic - Handles trip groups and their membership.
//!
//! A group is created by its leader, who is inserted as the first member in the
//! same database transaction. Members carry their committed budget share and
//! wallet balance, which the settlement module reads.

use crate::{
    entities::{GroupMember, TripGroup, group_member, trip_group},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Returns true if `user_id` leads the group.
#[must_use]
pub fn is_leader(group: &trip_group::Model, user_id: &str) -> bool {
    group.leader_id == user_id
}

/// Creates a new group and registers the leader as its first member.
///
/// # Errors
/// Returns an error if:
/// - The name or destination is empty or whitespace-only
/// - The end date is before the start date
/// - The database insert fails
pub async fn create_group(
    db: &DatabaseConnection,
    name: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leader_id: String,
    leader_name: String,
) -> Result<trip_group::Model> {
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Group name cannot be empty".to_string(),
        });
    }

    if destination.trim().is_empty() {
        return Err(Error::Config {
            message: "Destination cannot be empty".to_string(),
        });
    }

    if end_date < start_date {
        return Err(Error::Config {
            message: format!("Trip ends ({end_date}) before it starts ({start_date})"),
        });
    }

    let now = chrono::Utc::now();
    let txn = db.begin().await?;

    let group = trip_group::ActiveModel {
        name: Set(name.trim().to_string()),
        destination: Set(destination.trim().to_string()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        leader_id: Set(leader_id.clone()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    group_member::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(leader_id),
        display_name: Set(leader_name),
        budget_share: Set(0.0),
        wallet_balance: Set(0.0),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        "Created group {} '{}' to {} led by {}",
        group.id, group.name, group.destination, group.leader_id
    );
    Ok(group)
}

/// Finds a group by its unique ID.
pub async fn get_group_by_id<C>(db: &C, group_id: i64) -> Result<Option<trip_group::Model>>
where
    C: ConnectionTrait,
{
    TripGroup::find_by_id(group_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_group_by_id`], but a missing group is an error.
///
/// # Errors
/// Returns `Error::GroupNotFound` if no group has this ID.
pub async fn require_group<C>(db: &C, group_id: i64) -> Result<trip_group::Model>
where
    C: ConnectionTrait,
{
    get_group_by_id(db, group_id)
        .await?
        .ok_or_else(|| Error::GroupNotFound {
            id: group_id.to_string(),
        })
}

/// Lists every group the user belongs to, ordered by trip start date.
pub async fn list_groups_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<trip_group::Model>> {
    let group_ids: Vec<i64> = GroupMember::find()
        .filter(group_member::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.group_id)
        .collect();

    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    TripGroup::find()
        .filter(trip_group::Column::Id.is_in(group_ids))
        .order_by_asc(trip_group::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks up one member of a group.
pub async fn get_member<C>(
    db: &C,
    group_id: i64,
    user_id: &str,
) -> Result<Option<group_member::Model>>
where
    C: ConnectionTrait,
{
    GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_member`], but a non-member is an error.
///
/// # Errors
/// Returns `Error::NotMember` if the user has not joined the group.
pub async fn require_member<C>(db: &C, group_id: i64, user_id: &str) -> Result<group_member::Model>
where
    C: ConnectionTrait,
{
    get_member(db, group_id, user_id)
        .await?
        .ok_or_else(|| Error::NotMember {
            group_id,
            user_id: user_id.to_string(),
        })
}

/// Lists the members of a group in the order they joined.
pub async fn list_members<C>(db: &C, group_id: i64) -> Result<Vec<group_member::Model>>
where
    C: ConnectionTrait,
{
    GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .order_by_asc(group_member::Column::JoinedAt)
        .order_by_asc(group_member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a user to a group.
///
/// # Errors
/// Returns an error if the group doesn't exist, the display name is empty,
/// or the user is already a member.
pub async fn add_member(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: String,
    display_name: String,
) -> Result<group_member::Model> {
    require_group(db, group_id).await?;

    if display_name.trim().is_empty() {
        return Err(Error::Config {
            message: "Display name cannot be empty".to_string(),
        });
    }

    if get_member(db, group_id, &user_id).await?.is_some() {
        return Err(Error::Config {
            message: format!("User {user_id} is already a member of group {group_id}"),
        });
    }

    let member = group_member::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        display_name: Set(display_name.trim().to_string()),
        budget_share: Set(0.0),
        wallet_balance: Set(0.0),
        joined_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("User {} joined group {}", member.user_id, group_id);
    Ok(member)
}

/// Removes a member from a group.
///
/// Members may remove themselves; the leader may remove anyone but themselves.
///
/// # Errors
/// Returns `Error::PermissionDenied` when the actor may not remove the target,
/// or `Error::NotMember` if the target isn't in the group.
pub async fn remove_member(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    user_id: &str,
) -> Result<()> {
    let group = require_group(db, group_id).await?;

    if is_leader(&group, user_id) {
        return Err(Error::PermissionDenied {
            reason: "The group leader cannot leave or be removed".to_string(),
        });
    }

    if actor_id != user_id && !is_leader(&group, actor_id) {
        warn!(
            "User {} tried to remove {} from group {} without being leader",
            actor_id, user_id, group_id
        );
        return Err(Error::PermissionDenied {
            reason: "Only the group leader can remove other members".to_string(),
        });
    }

    let member = require_member(db, group_id, user_id).await?;
    member.delete(db).await?;
    info!("Removed user {} from group {}", user_id, group_id);
    Ok(())
}

/// Updates members' committed budget shares.
///
/// A member's wallet balance moves by the same delta as their share, so the
/// amount they already spent personally (`share - wallet`) is unchanged.
/// Non-leaders may only change their own share.
///
/// # Errors
/// Returns an error if a share is negative or not finite, a user isn't a member,
/// or a non-leader tries to change someone else's share.
pub async fn update_budget_shares(
    db: &DatabaseConnection,
    group_id: i64,
    actor_id: &str,
    shares: &HashMap<String, f64>,
) -> Result<Vec<group_member::Model>> {
    let group = require_group(db, group_id).await?;

    if let Some(bad) = shares.values().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(Error::InvalidAmount { amount: *bad });
    }

    if !is_leader(&group, actor_id) && shares.keys().any(|uid| uid != actor_id) {
        return Err(Error::PermissionDenied {
            reason: "Only the group leader can change other members' shares".to_string(),
        });
    }

    let txn = db.begin().await?;
    let mut updated = Vec::with_capacity(shares.len());

    for (user_id, share) in shares {
        let member = require_member(&txn, group_id, user_id).await?;
        let delta = share - member.budget_share;
        let new_wallet = member.wallet_balance + delta;

        let mut active: group_member::ActiveModel = member.into();
        active.budget_share = Set(*share);
        active.wallet_balance = Set(new_wallet);
        updated.push(active.update(&txn).await?);
    }

    txn.commit().await?;
    debug!("Updated {} budget shares in group {}", updated.len(), group_id);
    Ok(updated)
}

/// Sets what remains in a member's wallet.
///
/// # Errors
/// Returns an error if the amount is not finite or the user isn't a member.
pub async fn set_wallet_balance(
    db: &DatabaseConnection,
    group_id: i64,
    user_id: &str,
    wallet_balance: f64,
) -> Result<group_member::Model> {
    if !wallet_balance.is_finite() {
        return Err(Error::InvalidAmount {
            amount: wallet_balance,
        });
    }

    let member = require_member(db, group_id, user_id).await?;
    let mut active: group_member::ActiveModel = member.into();
    active.wallet_balance = Set(wallet_balance);
    let updated = active.update(db).await?;
    info!(
        "Wallet of {} in group {} set to {:.2}",
        user_id, group_id, wallet_balance
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_group_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_group(
            &db,
            "   ".to_string(),
            "Lisbon".to_string(),
            date(2026, 6, 1),
            date(2026, 6, 7),
            LEADER.to_string(),
            "Lea".to_string(),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        let result = create_group(
            &db,
            "Summer".to_string(),
            "Lisbon".to_string(),
            date(2026, 6, 7),
            date(2026, 6, 1),
            LEADER.to_string(),
            "Lea".to_string(),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_group_adds_leader_as_member() -> Result<()> {
        let db = setup_test_db().await?;
        let group = create_test_group(&db, "Summer").await?;

        let members = list_members(&db, group.id).await?;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, LEADER);
        assert!(is_leader(&group, LEADER));
        assert!(!is_leader(&group, ALICE));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_member_rejects_duplicates() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;

        let result = add_member(&db, group.id, ALICE.to_string(), "Alice".to_string()).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        assert_eq!(list_members(&db, group.id).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_groups_for_user() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;
        create_test_group(&db, "Other trip").await?;

        let alice_groups = list_groups_for_user(&db, ALICE).await?;
        assert_eq!(alice_groups.len(), 1);
        assert_eq!(alice_groups[0].id, group.id);

        assert_eq!(list_groups_for_user(&db, LEADER).await?.len(), 2);
        assert!(list_groups_for_user(&db, "stranger").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_member_permissions() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;

        // Bob can't remove Alice
        let result = remove_member(&db, group.id, BOB, ALICE).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        // Leader can't be removed
        let result = remove_member(&db, group.id, LEADER, LEADER).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        // Alice can leave
        remove_member(&db, group.id, ALICE, ALICE).await?;
        // Leader removes Bob
        remove_member(&db, group.id, LEADER, BOB).await?;

        let members = list_members(&db, group.id).await?;
        assert_eq!(members.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_budget_shares_moves_wallet() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;

        let shares = HashMap::from([(ALICE.to_string(), 300.0), (BOB.to_string(), 200.0)]);
        update_budget_shares(&db, group.id, LEADER, &shares).await?;

        set_wallet_balance(&db, group.id, ALICE, 250.0).await?;

        // Raising Alice's share by 100 raises her wallet by 100 too
        let shares = HashMap::from([(ALICE.to_string(), 400.0)]);
        let updated = update_budget_shares(&db, group.id, ALICE, &shares).await?;
        assert_eq!(updated[0].budget_share, 400.0);
        assert_eq!(updated[0].wallet_balance, 350.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_budget_shares_permissions_and_validation() -> Result<()> {
        let (db, group) = setup_group_with_members().await?;

        let shares = HashMap::from([(BOB.to_string(), 100.0)]);
        let result = update_budget_shares(&db, group.id, ALICE, &shares).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        let shares = HashMap::from([(ALICE.to_string(), -5.0)]);
        let result = update_budget_shares(&db, group.id, LEADER, &shares).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -5.0 }
        ));

        let shares = HashMap::from([("stranger".to_string(), 10.0)]);
        let result = update_budget_shares(&db, group.id, LEADER, &shares).await;
        assert!(matches!(result.unwrap_err(), Error::NotMember { .. }));

        Ok(())
    }
}
