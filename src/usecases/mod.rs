//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! service's workflows.
//!
//! Use cases:
//! - `WagerPlacement`: Parse and store new wagers
//! - `SettlementScheduler`: Periodic fetch, resolve and commit loop
//! - `RequestBudget`: Score provider rate limit and quota caps

pub mod placement;
pub mod request_budget;
pub mod settlement;

pub use placement::{PlacementError, PlacementRequest, WagerPlacement};
pub use request_budget::{BudgetExhausted, BudgetUsage, RequestBudget};
pub use settlement::{SettlementReport, SettlementScheduler};
