//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `TripBuddy` application,
//! including all slash commands, autocomplete handlers, the shared bot context
//! and the framework error handler.

/// Discord command implementations (trip, budget, expense, settle, plan, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::categories::Config as CategoryConfig,
    core::{itinerary::ItineraryPlanner, optimistic::GroupDashboard, realtime::ChangeFeed},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Change notifications published after every successful write
    pub feed: ChangeFeed,
    /// AI backend, `None` when no API key is configured
    pub planner: Option<Arc<dyn ItineraryPlanner>>,
    /// Category templates used when a budget is set from a total
    pub categories: CategoryConfig,
    /// Live dashboards by group ID, each following `feed`
    dashboards: Mutex<HashMap<i64, Arc<GroupDashboard>>>,
}

impl BotData {
    /// Creates the shared context for all commands.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        planner: Option<Arc<dyn ItineraryPlanner>>,
        categories: CategoryConfig,
    ) -> Self {
        Self {
            database,
            feed: ChangeFeed::default(),
            planner,
            categories,
            dashboards: Mutex::new(HashMap::new()),
        }
    }

    /// The live dashboard of a group, loaded on first use.
    ///
    /// A loaded dashboard stays subscribed to the change feed, so writes made
    /// through other commands show up without reloading it.
    ///
    /// # Errors
    /// Returns an error if the dashboard has to be loaded and loading fails.
    pub async fn dashboard(&self, group_id: i64) -> Result<Arc<GroupDashboard>> {
        let mut dashboards = self.dashboards.lock().await;
        if let Some(dashboard) = dashboards.get(&group_id) {
            return Ok(Arc::clone(dashboard));
        }

        // Subscribe before loading so no change between the two is missed
        let subscription = self.feed.subscribe(group_id);
        let dashboard = Arc::new(GroupDashboard::load(self.database.clone(), group_id).await?);
        let follower = Arc::clone(&dashboard);
        tokio::spawn(async move { follower.follow(subscription).await });

        debug!("Dashboard for group {} loaded and following changes", group_id);
        dashboards.insert(group_id, Arc::clone(&dashboard));
        Ok(dashboard)
    }
}

/// What a user sees when a command fails.
///
/// Validation and permission errors are shown as-is; infrastructure errors
/// get a generic message and are only logged.
#[must_use]
pub fn user_message(error: &Error) -> String {
    match error {
        Error::Database(_)
        | Error::Http(_)
        | Error::Json(_)
        | Error::Fmt(_)
        | Error::TryFromInt(_)
        | Error::EnvVar(_)
        | Error::Framework(_) => "❌ Something went wrong. Please try again later.".to_string(),
        other => format!("❌ {other}"),
    }
}

/// Framework error handler: logs everything, replies to the user for command errors.
pub async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().qualified_name, error);
            if let Err(e) = ctx.say(user_message(&error)).await {
                error!("Failed to send error message: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

pub use commands::*;
pub use handlers::*;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{expense, realtime::ChangeKind};
    use crate::test_utils::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dashboard_is_cached_and_follows_feed() -> Result<()> {
        let (db, group) = setup_group_with_budget().await?;
        let data = BotData::new(db.clone(), None, CategoryConfig::builtin());

        let dashboard = data.dashboard(group.id).await?;
        assert!(Arc::ptr_eq(&dashboard, &data.dashboard(group.id).await?));
        assert!(dashboard.state().await.expenses.is_empty());

        expense::add_expense(&db, group.id, ALICE, new_expense("Food", 30.0)).await?;
        assert_eq!(data.feed.notify(group.id, ChangeKind::Expenses), 1);

        tokio::time::timeout(Duration::from_secs(5), async {
            while dashboard.state().await.expenses.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        Ok(())
    }

    #[test]
    fn test_user_message_hides_infrastructure_errors() {
        let db_error = Error::Database(sea_orm::DbErr::Custom("disk I/O".to_string()));
        assert!(!user_message(&db_error).contains("disk"));

        let locked = Error::CategoryLocked {
            name: "Lodging".to_string(),
        };
        assert_eq!(
            user_message(&locked),
            "❌ Category 'Lodging' is locked by the group leader"
        );
    }
}
