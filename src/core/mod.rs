//! Core business logic - framework-agnostic group, budget, expense and planning operations.
//!
//! Nothing in here knows about Discord. The bot layer calls these functions and
//! formats whatever they return.

/// Per-category spent/budgeted/remaining aggregation
pub mod aggregation;
/// Group budget, category allocations and category locks
pub mod budget;
/// Group expenses and their splits
pub mod expense;
/// Trip groups and their members
pub mod group;
/// AI itinerary data, prompts and the completion backend
pub mod itinerary;
/// Selected group, cached current plan and the saved-plan library
pub mod library;
/// Optimistic view state with rollback on failed writes
pub mod optimistic;
/// Finalized plan proposals and approval voting
pub mod plan;
/// Change notifications for group data
pub mod realtime;
/// Text formatting helpers for reports
pub mod report;
/// Member balances, final settlement and transfer suggestions
pub mod settlement;
