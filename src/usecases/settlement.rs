//! Settlement Use Case - Periodic Wager Settlement
//!
//! Drives settlement of every pending wager on a fixed interval.
//!
//! Settlement flow (one run):
//! 1. Load pending wagers and group them by every event they reference
//! 2. Fetch each distinct event once, bounded fan-out, budget gated
//! 3. Resolve each wager against the fetched events
//! 4. Commit terminal outcomes with a compare-and-set transition
//!
//! A fetch failure only affects the wagers that reference that event.
//! Quota exhaustion pauses the rest of the run's fetches. Nothing is ever
//! marked failed: unresolved wagers simply stay pending for the next run.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::event::{Event, EventId, EventScore};
use crate::domain::outcome::{Outcome, PendingReason, resolve_selection};
use crate::domain::payout::{combination_price, settled_return};
use crate::domain::selection::Selection;
use crate::domain::wager::{Wager, WagerId, WagerStatus};
use crate::ports::repository::{TransitionResult, WagerRepository};
use crate::ports::score_provider::{ProviderError, ScoreProvider};

use super::request_budget::RequestBudget;

/// An event whose scores could not be fetched this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
  /// External event id.
  pub event_id: EventId,
  /// Provider or storage error message.
  pub error: String,
}

/// A terminal status committed this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedSettlement {
  /// Settled wager.
  pub wager_id: WagerId,
  /// Status applied.
  pub status: WagerStatus,
  /// Amount returned to the bettor; `None` if it overflowed.
  pub payout: Option<Decimal>,
}

/// Per-outcome commit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
  pub won: usize,
  pub lost: usize,
  pub push: usize,
}

/// Aggregated report from one settlement run.
#[derive(Debug, Clone)]
pub struct SettlementReport {
  /// Run start.
  pub started_at: DateTime<Utc>,
  /// Run end.
  pub finished_at: DateTime<Utc>,
  /// Pending wagers loaded.
  pub wagers_considered: usize,
  /// Distinct events fetched successfully.
  pub events_fetched: usize,
  /// Referenced events with no stored record.
  pub events_unknown: usize,
  /// Fetches skipped because the quota ran out.
  pub events_skipped: usize,
  /// Per-event fetch failures.
  pub fetch_failures: Vec<FetchFailure>,
  /// Whether the quota paused fetching.
  pub quota_paused: bool,
  /// Terminal transitions applied.
  pub committed: Vec<CommittedSettlement>,
  /// Committed outcomes by kind.
  pub counts: OutcomeCounts,
  /// Wagers another writer settled first.
  pub already_settled: usize,
  /// Wagers left pending.
  pub still_pending: usize,
  /// Wagers whose commit errored.
  pub commit_failures: usize,
}

impl SettlementReport {
  fn starting(started_at: DateTime<Utc>) -> Self {
    Self {
      started_at,
      finished_at: started_at,
      wagers_considered: 0,
      events_fetched: 0,
      events_unknown: 0,
      events_skipped: 0,
      fetch_failures: Vec::new(),
      quota_paused: false,
      committed: Vec::new(),
      counts: OutcomeCounts::default(),
      already_settled: 0,
      still_pending: 0,
      commit_failures: 0,
    }
  }

  /// Wall-clock duration of the run.
  pub fn duration(&self) -> chrono::Duration {
    self.finished_at - self.started_at
  }

  fn record_commit(&mut self, wager_id: WagerId, status: WagerStatus, payout: Option<Decimal>) {
    match status {
      WagerStatus::Won => self.counts.won += 1,
      WagerStatus::Lost => self.counts.lost += 1,
      WagerStatus::Push => self.counts.push += 1,
      WagerStatus::Pending | WagerStatus::Voided => {}
    }
    self.committed.push(CommittedSettlement {
      wager_id,
      status,
      payout,
    });
  }
}

/// Result of one event fetch.
enum Fetch {
  Scores(EventScore),
  Failed(ProviderError),
  Skipped,
}

/// Periodic settlement driver.
pub struct SettlementScheduler<P: ScoreProvider, R: WagerRepository> {
  provider: Arc<P>,
  repo: Arc<R>,
  budget: Arc<RequestBudget>,
  /// Time between runs.
  interval: Duration,
  /// Maximum concurrent fetches per run.
  fetch_parallelism: usize,
}

impl<P: ScoreProvider, R: WagerRepository> SettlementScheduler<P, R> {
  /// Create a new scheduler.
  pub fn new(
    provider: Arc<P>,
    repo: Arc<R>,
    budget: Arc<RequestBudget>,
    interval: Duration,
    fetch_parallelism: usize,
  ) -> Self {
    Self {
      provider,
      repo,
      budget,
      interval,
      fetch_parallelism: fetch_parallelism.max(1),
    }
  }

  /// Run forever on the configured interval until shutdown.
  ///
  /// Each run finishes before the next tick is awaited, so runs never
  /// overlap. Shutdown is only observed between runs.
  pub async fn run<F>(&self, mut shutdown: broadcast::Receiver<()>, mut on_report: F)
  where
    F: FnMut(&SettlementReport) + Send,
  {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
      interval_secs = self.interval.as_secs(),
      fetch_parallelism = self.fetch_parallelism,
      "Settlement scheduler started"
    );

    loop {
      tokio::select! {
        biased;
        _ = shutdown.recv() => {
          info!("Settlement scheduler shutting down");
          break;
        }
        _ = ticker.tick() => {
          match self.run_once().await {
            Ok(report) => on_report(&report),
            Err(e) => error!(error = %e, "Settlement run failed"),
          }
        }
      }
    }
  }

  /// Execute one settlement run.
  #[instrument(skip(self))]
  pub async fn run_once(&self) -> Result<SettlementReport> {
    let mut report = SettlementReport::starting(Utc::now());

    let pending = self
      .repo
      .pending_wagers()
      .await
      .context("Failed to load pending wagers")?;
    report.wagers_considered = pending.len();

    if pending.is_empty() {
      debug!("No pending wagers");
      report.finished_at = Utc::now();
      return Ok(report);
    }

    // Phase 1: Group by referenced event
    let mut by_event: BTreeMap<EventId, usize> = BTreeMap::new();
    for wager in &pending {
      for event_id in wager.event_ids() {
        *by_event.entry(event_id.clone()).or_default() += 1;
      }
    }
    for (event_id, wagers) in &by_event {
      debug!(event_id = %event_id, wagers, "Event referenced by pending wagers");
    }

    info!(
      wagers = pending.len(),
      events = by_event.len(),
      "Starting settlement run"
    );

    // Phase 2: Fetch each distinct event once
    let stored = self.load_events(by_event.keys(), &mut report).await;
    let events = self.fetch_events(stored, &mut report).await;

    // Phase 3 + 4: Resolve and commit
    for wager in &pending {
      self.settle_wager(wager, &events, &mut report).await;
    }

    report.finished_at = Utc::now();
    info!(
      considered = report.wagers_considered,
      won = report.counts.won,
      lost = report.counts.lost,
      push = report.counts.push,
      still_pending = report.still_pending,
      already_settled = report.already_settled,
      fetch_failures = report.fetch_failures.len(),
      commit_failures = report.commit_failures,
      quota_paused = report.quota_paused,
      "Settlement run complete"
    );

    Ok(report)
  }

  /// Load the stored record (team names, sport) of each referenced event.
  async fn load_events<'a>(
    &self,
    ids: impl Iterator<Item = &'a EventId>,
    report: &mut SettlementReport,
  ) -> Vec<Event> {
    let mut stored = Vec::new();
    for id in ids {
      match self.repo.event(id).await {
        Ok(Some(event)) => stored.push(event),
        Ok(None) => {
          warn!(event_id = %id, "Pending wager references unknown event");
          report.events_unknown += 1;
        }
        Err(e) => {
          warn!(event_id = %id, error = %e, "Failed to load stored event");
          report.fetch_failures.push(FetchFailure {
            event_id: id.clone(),
            error: format!("{e:#}"),
          });
        }
      }
    }
    stored
  }

  /// Fetch scores for every event, at most `fetch_parallelism` at once.
  async fn fetch_events(
    &self,
    stored: Vec<Event>,
    report: &mut SettlementReport,
  ) -> HashMap<EventId, Event> {
    let paused = AtomicBool::new(false);
    let paused = &paused;

    let results: Vec<(Event, Fetch)> = stream::iter(stored)
      .map(move |event| async move {
        if paused.load(Ordering::Acquire) {
          return (event, Fetch::Skipped);
        }
        if let Err(exhausted) = self.budget.acquire().await {
          paused.store(true, Ordering::Release);
          return (
            event,
            Fetch::Failed(ProviderError::QuotaExhausted(exhausted.to_string())),
          );
        }
        match self.provider.fetch_scores(&event).await {
          Ok(scores) => (event, Fetch::Scores(scores)),
          Err(e) => {
            if e.is_quota() {
              paused.store(true, Ordering::Release);
            }
            (event, Fetch::Failed(e))
          }
        }
      })
      .buffer_unordered(self.fetch_parallelism)
      .collect()
      .await;

    let mut events = HashMap::with_capacity(results.len());
    for (event, fetch) in results {
      match fetch {
        Fetch::Scores(scores) => {
          let updated = event.with_feed(&scores);
          if let Err(e) = self.repo.upsert_event(&updated).await {
            warn!(event_id = %updated.id, error = %e, "Failed to persist fetched scores");
          }
          report.events_fetched += 1;
          events.insert(updated.id.clone(), updated);
        }
        Fetch::Failed(e) if e.is_quota() => {
          warn!(event_id = %event.id, error = %e, "Score quota exhausted; pausing fetches");
          report.quota_paused = true;
          report.events_skipped += 1;
        }
        Fetch::Failed(e) => {
          warn!(event_id = %event.id, error = %e, "Score fetch failed");
          report.fetch_failures.push(FetchFailure {
            event_id: event.id,
            error: e.to_string(),
          });
        }
        Fetch::Skipped => {
          debug!(event_id = %event.id, "Score fetch skipped after quota pause");
          report.events_skipped += 1;
        }
      }
    }
    events
  }

  /// Resolve one wager and commit it if terminal.
  async fn settle_wager(
    &self,
    wager: &Wager,
    events: &HashMap<EventId, Event>,
    report: &mut SettlementReport,
  ) {
    let resolution = resolve_selection(wager.selection(), &wager.event_id, events);

    let Some(status) = resolution.outcome.terminal_status() else {
      log_pending(wager, resolution.reason.as_ref());
      report.still_pending += 1;
      return;
    };

    let decimal_price = match wager.selection() {
      Selection::Combination(legs) => combination_price(legs, &resolution.leg_outcomes),
      Selection::Single(_) => Some(wager.price.to_decimal()),
    };
    let payout = match decimal_price {
      Some(price) => settled_return(wager.amount, price, resolution.outcome),
      None if resolution.outcome == Outcome::Lost => Some(Decimal::ZERO),
      None => None,
    };
    if payout.is_none() {
      // The status is still committed; only the amount is unavailable.
      warn!(
        wager_id = %wager.id,
        amount = %wager.amount,
        price = %wager.price,
        status = %status,
        "Payout overflowed decimal range"
      );
    }

    match self.repo.transition(&wager.id, status, Utc::now()).await {
      Ok(TransitionResult::Applied) => {
        info!(
          wager_id = %wager.id,
          event_id = %wager.event_id,
          kind = %wager.kind,
          status = %status,
          payout = ?payout,
          "Wager settled"
        );
        report.record_commit(wager.id, status, payout);
      }
      Ok(TransitionResult::AlreadySettled(current)) => {
        debug!(wager_id = %wager.id, current = %current, "Wager already settled");
        report.already_settled += 1;
      }
      Ok(TransitionResult::NotFound) => {
        warn!(wager_id = %wager.id, "Wager disappeared before commit");
        report.commit_failures += 1;
      }
      Err(e) => {
        error!(wager_id = %wager.id, error = %e, "Failed to commit settlement");
        report.commit_failures += 1;
      }
    }
  }
}

/// Log why a wager stays pending, at a level matching the cause.
fn log_pending(wager: &Wager, reason: Option<&PendingReason>) {
  match reason {
    Some(reason) if reason.is_data_quality() => warn!(
      wager_id = %wager.id,
      event_id = %wager.event_id,
      reason = %reason,
      "Score feed cannot be attributed to stored teams"
    ),
    Some(reason) if reason.requires_manual_settlement() => info!(
      wager_id = %wager.id,
      event_id = %wager.event_id,
      kind = %wager.kind,
      "Wager requires manual settlement"
    ),
    Some(reason) => debug!(
      wager_id = %wager.id,
      event_id = %wager.event_id,
      reason = %reason,
      "Wager not yet resolvable"
    ),
    None => debug!(wager_id = %wager.id, "Wager not yet resolvable"),
  }
}
