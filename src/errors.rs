//! Unified error type for `TripBuddy`.
//!
//! Every fallible operation in the crate returns [`Result`]. Core functions
//! propagate with `?`; the bot layer turns whatever reaches it into a reply.

use thiserror::Error;

/// All errors the application can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input or configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Amount is zero, negative, or not a finite number where one is required
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Group lookup failed
    #[error("Group not found: {id}")]
    GroupNotFound {
        /// Group ID that was requested
        id: String,
    },

    /// Expense lookup failed
    #[error("Expense not found: {id}")]
    ExpenseNotFound {
        /// Expense ID that was requested
        id: i64,
    },

    /// Finalized plan or saved plan lookup failed
    #[error("Plan not found: {id}")]
    PlanNotFound {
        /// Plan ID that was requested
        id: i64,
    },

    /// Category is not allocated in the group's budget
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Category name
        name: String,
    },

    /// Category is locked and the caller is not the leader
    #[error("Category '{name}' is locked by the group leader")]
    CategoryLocked {
        /// Category name
        name: String,
    },

    /// Category budgets don't add up to the total budget
    #[error("Category budgets total ${allocated:.2} but the total budget is ${total:.2}")]
    AllocationMismatch {
        /// Total budget requested
        total: f64,
        /// Sum of the category budgets
        allocated: f64,
    },

    /// Caller lacks the role required for the action
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Why the action was refused
        reason: String,
    },

    /// User is not a member of the group
    #[error("User {user_id} is not a member of group {group_id}")]
    NotMember {
        /// Group ID
        group_id: i64,
        /// User ID
        user_id: String,
    },

    /// Plan has already been finalized
    #[error("Plan {id} is already locked")]
    PlanLocked {
        /// Plan ID
        id: i64,
    },

    /// AI backend returned something unusable
    #[error("Itinerary error: {message}")]
    Itinerary {
        /// Description of the failure
        message: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// HTTP error talking to the AI backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Integer conversion error
    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// Formatting a reply failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error
    #[error("Discord framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
