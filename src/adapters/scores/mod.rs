//! Score Feed Adapters
//!
//! REST client implementing the `ScoreProvider` port and its wire types.

pub mod client;
pub mod types;

pub use client::{HttpScoreProvider, ScoreClientConfig};
