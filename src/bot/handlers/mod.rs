//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions that aren't commands
//! themselves, such as autocomplete.

/// Autocomplete handlers for budget categories and saved plans
pub mod autocomplete;
