//! Wager Store — Concrete Adapter for the Repository Port
//!
//! Keeps the wager book in memory behind a single async mutex and, when
//! opened on a data directory, mirrors every mutation to an atomic JSON
//! snapshot plus a JSONL settlement audit log.
//!
//! `transition` is the compare-and-set every terminal status goes
//! through: the status check and the write happen under the same lock,
//! so a wager leaves pending at most once.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::settlement_log::SettlementLog;
use super::snapshot::{BookSnapshot, SnapshotStore, SNAPSHOT_VERSION};
use crate::domain::event::{Event, EventId};
use crate::domain::wager::{Wager, WagerId, WagerStatus};
use crate::ports::repository::{SettlementRecord, TransitionResult, WagerRepository};

#[derive(Debug, Default)]
struct Book {
    wagers: HashMap<WagerId, Wager>,
    events: HashMap<EventId, Event>,
}

impl Book {
    fn snapshot(&self) -> BookSnapshot {
        let mut wagers: Vec<Wager> = self.wagers.values().cloned().collect();
        wagers.sort_by_key(|w| (w.created_at, w.id));
        let mut events: Vec<Event> = self.events.values().cloned().collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));
        BookSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            wagers,
            events,
        }
    }
}

/// File sinks used when the store is backed by a data directory.
struct Files {
    snapshot: SnapshotStore,
    log: SettlementLog,
}

/// Wager book with compare-and-set settlement.
pub struct WagerStore {
    book: Mutex<Book>,
    /// `None` for in-memory stores.
    files: Option<Files>,
}

impl WagerStore {
    /// Store with no file backing.
    pub fn in_memory() -> Self {
        Self {
            book: Mutex::new(Book::default()),
            files: None,
        }
    }

    /// Open (or create) a file-backed store in `data_dir`.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        let snapshot = SnapshotStore::new(dir).await?;
        let log = SettlementLog::new(dir).await?;

        let mut book = Book::default();
        if let Some(saved) = snapshot.load().await? {
            book.wagers = saved.wagers.into_iter().map(|w| (w.id, w)).collect();
            book.events = saved.events.into_iter().map(|e| (e.id.clone(), e)).collect();
        }

        info!(
            data_dir = %dir.display(),
            wagers = book.wagers.len(),
            events = book.events.len(),
            "Wager store opened"
        );

        Ok(Self {
            book: Mutex::new(book),
            files: Some(Files { snapshot, log }),
        })
    }

    /// Every audit record written so far (empty for in-memory stores).
    pub async fn settlement_history(&self) -> Result<Vec<SettlementRecord>> {
        match &self.files {
            Some(files) => files.log.load_all().await,
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, book: &Book) -> Result<()> {
        if let Some(files) = &self.files {
            files.snapshot.save(&book.snapshot()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WagerRepository for WagerStore {
    async fn insert_wager(&self, wager: &Wager) -> Result<()> {
        let mut book = self.book.lock().await;
        anyhow::ensure!(
            !book.wagers.contains_key(&wager.id),
            "Wager {} already exists",
            wager.id
        );
        book.wagers.insert(wager.id, wager.clone());
        if let Err(e) = self.persist(&book).await {
            book.wagers.remove(&wager.id);
            return Err(e.context("Failed to persist new wager"));
        }
        Ok(())
    }

    async fn wager(&self, id: &WagerId) -> Result<Option<Wager>> {
        Ok(self.book.lock().await.wagers.get(id).cloned())
    }

    async fn pending_wagers(&self) -> Result<Vec<Wager>> {
        let book = self.book.lock().await;
        let mut pending: Vec<Wager> = book
            .wagers
            .values()
            .filter(|w| w.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|w| (w.created_at, w.id));
        Ok(pending)
    }

    async fn upsert_event(&self, event: &Event) -> Result<()> {
        let mut book = self.book.lock().await;
        let previous = book.events.insert(event.id.clone(), event.clone());
        if let Err(e) = self.persist(&book).await {
            match previous {
                Some(prev) => book.events.insert(prev.id.clone(), prev),
                None => book.events.remove(&event.id),
            };
            return Err(e.context("Failed to persist event"));
        }
        Ok(())
    }

    async fn event(&self, id: &EventId) -> Result<Option<Event>> {
        Ok(self.book.lock().await.events.get(id).cloned())
    }

    #[instrument(skip_all, fields(wager_id = %id, to = %to))]
    async fn transition(
        &self,
        id: &WagerId,
        to: WagerStatus,
        at: DateTime<Utc>,
    ) -> Result<TransitionResult> {
        anyhow::ensure!(to.is_terminal(), "Cannot transition wager to {to}");

        let mut book = self.book.lock().await;
        let Some(wager) = book.wagers.get_mut(id) else {
            return Ok(TransitionResult::NotFound);
        };

        let before = wager.clone();
        if let Err(current) = wager.settle(to, at) {
            return Ok(TransitionResult::AlreadySettled(current));
        }
        let event_id = wager.event_id.clone();

        if let Err(e) = self.persist(&book).await {
            book.wagers.insert(*id, before);
            return Err(e.context("Failed to persist settlement"));
        }

        if let Some(files) = &self.files {
            let record = SettlementRecord {
                wager_id: *id,
                event_id,
                from: WagerStatus::Pending,
                to,
                settled_at: at,
            };
            if let Err(e) = files.log.append(&record).await {
                warn!(error = %e, "Failed to append settlement audit record");
            }
        }

        Ok(TransitionResult::Applied)
    }

    async fn is_healthy(&self) -> bool {
        match &self.files {
            Some(files) => files.snapshot.is_healthy().await && files.log.is_healthy().await,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payout::AmericanOdds;
    use crate::domain::selection::{Direction, LegSelection, Selection};
    use crate::domain::wager::WagerKind;
    use rust_decimal_macros::dec;

    fn total_under(line: rust_decimal::Decimal) -> Wager {
        Wager::new(
            WagerKind::Total,
            "evt-1",
            dec!(50),
            AmericanOdds::new(-105).unwrap(),
            Selection::Single(LegSelection::Total {
                direction: Direction::Under,
                line,
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = WagerStore::in_memory();
        let wager = total_under(dec!(44));
        store.insert_wager(&wager).await.unwrap();

        let now = Utc::now();
        assert_eq!(
            store.transition(&wager.id, WagerStatus::Push, now).await.unwrap(),
            TransitionResult::Applied
        );
        assert_eq!(
            store.transition(&wager.id, WagerStatus::Won, now).await.unwrap(),
            TransitionResult::AlreadySettled(WagerStatus::Push)
        );

        let stored = store.wager(&wager.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), WagerStatus::Push);
        assert_eq!(stored.settled_at(), Some(now));
        assert!(store.pending_wagers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transition_unknown_wager() {
        let store = WagerStore::in_memory();
        let result = store
            .transition(&uuid::Uuid::new_v4(), WagerStatus::Lost, Utc::now())
            .await
            .unwrap();
        assert_eq!(result, TransitionResult::NotFound);
    }

    #[tokio::test]
    async fn test_transition_to_pending_rejected() {
        let store = WagerStore::in_memory();
        let wager = total_under(dec!(44));
        store.insert_wager(&wager).await.unwrap();
        assert!(store
            .transition(&wager.id, WagerStatus::Pending, Utc::now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_void_uses_same_guard() {
        let store = WagerStore::in_memory();
        let wager = total_under(dec!(44));
        store.insert_wager(&wager).await.unwrap();

        assert_eq!(
            store.void_wager(&wager.id, Utc::now()).await.unwrap(),
            TransitionResult::Applied
        );
        assert_eq!(
            store.transition(&wager.id, WagerStatus::Won, Utc::now()).await.unwrap(),
            TransitionResult::AlreadySettled(WagerStatus::Voided)
        );
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = WagerStore::in_memory();
        let wager = total_under(dec!(44));
        store.insert_wager(&wager).await.unwrap();
        assert!(store.insert_wager(&wager).await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let wager = total_under(dec!(45.5));
        {
            let store = WagerStore::open(data_dir).await.unwrap();
            store
                .upsert_event(&Event::new("evt-1", "americanfootball_nfl", "Home Team", "Away Team"))
                .await
                .unwrap();
            store.insert_wager(&wager).await.unwrap();
            store
                .transition(&wager.id, WagerStatus::Won, Utc::now())
                .await
                .unwrap();
            assert!(store.is_healthy().await);
        }

        let reopened = WagerStore::open(data_dir).await.unwrap();
        let stored = reopened.wager(&wager.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), WagerStatus::Won);
        assert!(reopened.event(&"evt-1".to_string()).await.unwrap().is_some());

        let history = reopened.settlement_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].wager_id, wager.id);
        assert_eq!(history[0].to, WagerStatus::Won);
    }
}
