//! Persistence Adapters - File-backed Wager Storage
//!
//! Implements the `WagerRepository` port with an in-memory book mirrored
//! to an atomic JSON snapshot and an append-only JSONL settlement log.
//! No database dependency.

pub mod settlement_log;
pub mod snapshot;
pub mod store;

pub use settlement_log::SettlementLog;
pub use snapshot::{BookSnapshot, SnapshotStore};
pub use store::WagerStore;
