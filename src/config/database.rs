//! Database configuration module for `TripBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    CategoryAllocation, ExpenseSplit, FinalizedPlan, GroupBudget, GroupExpense, GroupMember,
    PlanApproval, SavedPlan, SystemState, TripGroup,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/trip_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Uses `IF NOT EXISTS`, so it is safe to call on every startup.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, TripGroup).await?;
    create_table_for(db, &schema, GroupMember).await?;
    create_table_for(db, &schema, GroupBudget).await?;
    create_table_for(db, &schema, CategoryAllocation).await?;
    create_table_for(db, &schema, GroupExpense).await?;
    create_table_for(db, &schema, ExpenseSplit).await?;
    create_table_for(db, &schema, FinalizedPlan).await?;
    create_table_for(db, &schema, PlanApproval).await?;
    create_table_for(db, &schema, SavedPlan).await?;
    create_table_for(db, &schema, SystemState).await?;

    debug!("All tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        group_expense::Model as GroupExpenseModel, saved_plan::Model as SavedPlanModel,
        system_state::Model as SystemStateModel, trip_group::Model as TripGroupModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<TripGroupModel> = TripGroup::find().limit(1).all(&db).await?;
        let _: Vec<GroupExpenseModel> = GroupExpense::find().limit(1).all(&db).await?;
        let _: Vec<SavedPlanModel> = SavedPlan::find().limit(1).all(&db).await?;
        let _: Vec<SystemStateModel> = SystemState::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
