//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, HTTP servers).
//!
//! Adapter categories:
//! - `scores`: REST score feed client
//! - `persistence`: Wager snapshot store and JSONL settlement log
//! - `metrics`: Prometheus metrics export and health checks

pub mod metrics;
pub mod persistence;
pub mod scores;
