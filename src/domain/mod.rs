//! Domain layer - Core settlement logic and models.
//!
//! Pure, synchronous code: wagers, events, selection parsing, outcome
//! resolution and combination aggregation. No I/O here (hexagonal
//! architecture inner ring); everything is testable in isolation.

pub mod combination;
pub mod event;
pub mod outcome;
pub mod parser;
pub mod payout;
pub mod selection;
pub mod wager;

// Re-export core types for convenience
pub use combination::{evaluate_legs, resolve_combination, won_leg_indices};
pub use event::{Event, EventId, EventScore, FinalScore, ScoreEntry};
pub use outcome::{resolve, resolve_selection, Outcome, PendingReason, Resolution};
pub use parser::{parse, parse_combination, LegInput, ParseError};
pub use payout::{combination_price, settled_return, AmericanOdds};
pub use selection::{Direction, Leg, LegSelection, Selection, Side};
pub use wager::{Wager, WagerError, WagerId, WagerKind, WagerStatus};
