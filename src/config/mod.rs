/// AI backend settings from environment variables
pub mod ai;

/// Default budget category templates from config.toml
pub mod categories;

/// Database configuration and connection management
pub mod database;
