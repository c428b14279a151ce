//! Score Provider Port - External Score Feed Interface
//!
//! Defines the trait for fetching the completion state and tagged
//! scores of a single event from an external data provider. The
//! settlement use case only ever sees `EventScore`; transport, auth and
//! wire formats stay in the adapter.

use async_trait::async_trait;

use crate::domain::event::{Event, EventScore};

/// Failures reported by a score provider.
///
/// Every variant is isolated to the event being fetched. Only
/// `QuotaExhausted` has run-wide effect: the scheduler stops issuing
/// fetches until the next run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
  /// Request budget used up (locally or as reported by the provider).
  #[error("score provider quota exhausted: {0}")]
  QuotaExhausted(String),
  /// Connection, timeout or TLS failure.
  #[error("score provider transport error: {0}")]
  Transport(String),
  /// Non-success HTTP status that is not quota related.
  #[error("score provider returned {status}: {body}")]
  Status {
    /// HTTP status code.
    status: u16,
    /// Response body (truncated by the adapter).
    body: String,
  },
  /// Payload could not be decoded.
  #[error("score provider payload invalid: {0}")]
  Decode(String),
}

impl ProviderError {
  /// Whether this failure should pause the rest of the run.
  pub const fn is_quota(&self) -> bool {
    matches!(self, Self::QuotaExhausted(_))
  }
}

/// Trait for score feed providers.
///
/// `fetch_scores` receives the stored event so adapters can build
/// provider-specific requests (sport key, external id). Absent scores,
/// fewer than two entries or `completed = false` are ordinary results,
/// not errors.
#[async_trait]
pub trait ScoreProvider: Send + Sync + 'static {
  /// Fetch the current completion flag and scores for one event.
  async fn fetch_scores(&self, event: &Event) -> Result<EventScore, ProviderError>;

  /// Check if the provider is reachable.
  async fn is_healthy(&self) -> bool;
}
