//! Repository Port - Wager Persistence Gateway
//!
//! Defines the persistence operations the settlement core needs. The
//! one operation every terminal transition goes through is
//! `transition`: a compare-and-set on `status = pending` that is a
//! no-op when the wager has already left pending.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::{Event, EventId};
use crate::domain::wager::{Wager, WagerId, WagerStatus};

/// Result of a compare-and-set transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
  /// The wager was pending and now holds the new status.
  Applied,
  /// The wager had already left pending; nothing changed.
  AlreadySettled(WagerStatus),
  /// No wager with that id exists.
  NotFound,
}

/// Audit record written for every applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
  /// Wager that moved.
  pub wager_id: WagerId,
  /// Event the wager references.
  pub event_id: EventId,
  /// Status before the transition (always pending).
  pub from: WagerStatus,
  /// Terminal status applied.
  pub to: WagerStatus,
  /// Commit timestamp.
  pub settled_at: DateTime<Utc>,
}

/// Trait for wager persistence providers.
#[async_trait]
pub trait WagerRepository: Send + Sync + 'static {
  /// Store a newly placed wager.
  async fn insert_wager(&self, wager: &Wager) -> anyhow::Result<()>;

  /// Load one wager by id.
  async fn wager(&self, id: &WagerId) -> anyhow::Result<Option<Wager>>;

  /// Load every wager still pending.
  async fn pending_wagers(&self) -> anyhow::Result<Vec<Wager>>;

  /// Insert or replace a stored event.
  async fn upsert_event(&self, event: &Event) -> anyhow::Result<()>;

  /// Load one stored event by external id.
  async fn event(&self, id: &EventId) -> anyhow::Result<Option<Event>>;

  /// Move a wager from pending to `to`, atomically, only if it is still
  /// pending. `to` must be terminal.
  async fn transition(
    &self,
    id: &WagerId,
    to: WagerStatus,
    at: DateTime<Utc>,
  ) -> anyhow::Result<TransitionResult>;

  /// Administrative void. Same compare-and-set as settlement.
  async fn void_wager(&self, id: &WagerId, at: DateTime<Utc>) -> anyhow::Result<TransitionResult> {
    self.transition(id, WagerStatus::Voided, at).await
  }

  /// Check if the backing store is usable.
  async fn is_healthy(&self) -> bool;
}
