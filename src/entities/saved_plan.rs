//! Saved plan entity - A user's personal library of generated itineraries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saved plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saved_plans")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID of the owner
    pub owner_id: String,
    /// Title shown in the library listing
    pub title: String,
    /// Serialized `AiTripPlanData`
    #[sea_orm(column_type = "Text")]
    pub plan_json: String,
    /// When the plan was saved
    pub created_at: DateTimeUtc,
}

/// `SavedPlan` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
