//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category_allocation;
pub mod expense_split;
pub mod finalized_plan;
pub mod group_budget;
pub mod group_expense;
pub mod group_member;
pub mod plan_approval;
pub mod saved_plan;
pub mod system_state;
pub mod trip_group;

// Re-export specific types to avoid conflicts
pub use category_allocation::{
    Column as CategoryAllocationColumn, Entity as CategoryAllocation,
    Model as CategoryAllocationModel,
};
pub use expense_split::{
    Column as ExpenseSplitColumn, Entity as ExpenseSplit, Model as ExpenseSplitModel,
};
pub use finalized_plan::{
    Column as FinalizedPlanColumn, Entity as FinalizedPlan, Model as FinalizedPlanModel,
};
pub use group_budget::{
    Column as GroupBudgetColumn, Entity as GroupBudget, Model as GroupBudgetModel,
};
pub use group_expense::{
    Column as GroupExpenseColumn, Entity as GroupExpense, Model as GroupExpenseModel,
};
pub use group_member::{
    Column as GroupMemberColumn, Entity as GroupMember, Model as GroupMemberModel,
};
pub use plan_approval::{
    Column as PlanApprovalColumn, Entity as PlanApproval, Model as PlanApprovalModel,
};
pub use saved_plan::{Column as SavedPlanColumn, Entity as SavedPlan, Model as SavedPlanModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use trip_group::{Column as TripGroupColumn, Entity as TripGroup, Model as TripGroupModel};
