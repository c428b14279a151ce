//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ScoreProvider`: Per-event scores and completion state
//! - `WagerRepository`: Wager/event persistence with compare-and-set transitions

pub mod repository;
pub mod score_provider;

pub use repository::{SettlementRecord, TransitionResult, WagerRepository};
pub use score_provider::{ProviderError, ScoreProvider};
