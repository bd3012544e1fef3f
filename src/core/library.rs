//! Per-user and per-group state plus the personal library of saved itineraries.
//!
//! Small key/value state lives in the `system_state` table under
//! `selected_group:<user_id>` and `current_plan:<group_id>` keys. Saved plans get
//! their own table because users list and delete them.

use crate::{
    core::{group, itinerary::AiTripPlanData},
    entities::{SavedPlan, SystemState, saved_plan, system_state, trip_group},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, warn};

const UNTITLED_PLAN: &str = "Untitled trip";

fn selected_group_key(user_id: &str) -> String {
    format!("selected_group:{user_id}")
}

fn current_plan_key(group_id: i64) -> String {
    format!("current_plan:{group_id}")
}

async fn get_state<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?
        .map(|s| s.value))
}

async fn set_state<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Makes `group_id` the group `user_id` works in.
///
/// # Errors
/// Returns `Error::GroupNotFound` or `Error::NotMember` if the user can't select the group.
pub async fn select_group(
    db: &DatabaseConnection,
    user_id: &str,
    group_id: i64,
) -> Result<trip_group::Model> {
    let group = group::require_group(db, group_id).await?;
    group::require_member(db, group_id, user_id).await?;
    set_state(db, &selected_group_key(user_id), group_id.to_string()).await?;
    debug!("User {} selected group {}", user_id, group_id);
    Ok(group)
}

/// The group `user_id` last selected, if it still exists and they're still in it.
pub async fn selected_group(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<trip_group::Model>> {
    let Some(value) = get_state(db, &selected_group_key(user_id)).await? else {
        return Ok(None);
    };

    let Ok(group_id) = value.parse::<i64>() else {
        warn!("Ignoring malformed selected group '{}' for {}", value, user_id);
        return Ok(None);
    };

    if group::get_member(db, group_id, user_id).await?.is_none() {
        return Ok(None);
    }
    group::get_group_by_id(db, group_id).await
}

/// Caches the plan the group is currently looking at.
pub async fn cache_current_plan(
    db: &DatabaseConnection,
    group_id: i64,
    plan: &AiTripPlanData,
) -> Result<()> {
    set_state(db, &current_plan_key(group_id), serde_json::to_string(plan)?).await
}

/// The cached plan of a group, if any.
///
/// # Errors
/// Returns `Error::Json` if the cached value is not a valid plan.
pub async fn cached_current_plan(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Option<AiTripPlanData>> {
    get_state(db, &current_plan_key(group_id))
        .await?
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(Error::from)
}

/// Saves a plan to `owner_id`'s library.
///
/// An empty title falls back to the plan's route.
pub async fn save_plan(
    db: &DatabaseConnection,
    owner_id: &str,
    title: &str,
    plan: &AiTripPlanData,
) -> Result<saved_plan::Model> {
    let title = [title.trim(), plan.overview.route.trim()]
        .into_iter()
        .find(|t| !t.is_empty())
        .unwrap_or(UNTITLED_PLAN)
        .to_string();

    let saved = saved_plan::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        title: Set(title),
        plan_json: Set(serde_json::to_string(plan)?),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("User {} saved plan {} '{}'", owner_id, saved.id, saved.title);
    Ok(saved)
}

/// Plans in `owner_id`'s library, newest first.
pub async fn list_saved_plans(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<saved_plan::Model>> {
    Ok(SavedPlan::find()
        .filter(saved_plan::Column::OwnerId.eq(owner_id))
        .order_by_desc(saved_plan::Column::CreatedAt)
        .order_by_desc(saved_plan::Column::Id)
        .all(db)
        .await?)
}

/// Loads one of `owner_id`'s saved plans.
///
/// # Errors
/// Returns `Error::PlanNotFound` if the plan doesn't exist or belongs to someone else.
pub async fn get_saved_plan(
    db: &DatabaseConnection,
    owner_id: &str,
    plan_id: i64,
) -> Result<(saved_plan::Model, AiTripPlanData)> {
    let saved = SavedPlan::find_by_id(plan_id)
        .one(db)
        .await?
        .filter(|p| p.owner_id == owner_id)
        .ok_or(Error::PlanNotFound { id: plan_id })?;
    let data = serde_json::from_str(&saved.plan_json)?;
    Ok((saved, data))
}

/// Deletes a saved plan.
///
/// # Errors
/// Returns `Error::PlanNotFound` if the plan doesn't exist, or
/// `Error::PermissionDenied` if it belongs to someone else.
pub async fn delete_saved_plan(
    db: &DatabaseConnection,
    owner_id: &str,
    plan_id: i64,
) -> Result<saved_plan::Model> {
    let saved = SavedPlan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })?;

    if saved.owner_id != owner_id {
        warn!(
            "User {} tried to delete plan {} owned by {}",
            owner_id, plan_id, saved.owner_id
        );
        return Err(Error::PermissionDenied {
            reason: "You can only delete your own saved plans".to_string(),
        });
    }

    SavedPlan::delete_by_id(plan_id).exec(db).await?;
    info!("User {} deleted saved plan {}", owner_id, plan_id);
    Ok(saved)
}
