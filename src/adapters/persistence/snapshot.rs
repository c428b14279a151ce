//! Snapshot Store - Atomic JSON Wager Book Persistence
//!
//! Saves the wager book (wagers + events) to `wagers.json` using atomic
//! writes (write to tmp file, then rename). The file is always either
//! the old or the new version, never a partial write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::domain::event::Event;
use crate::domain::wager::Wager;

/// Snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full persisted state of the wager book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub wagers: Vec<Wager>,
    pub events: Vec<Event>,
}

/// Atomic JSON snapshot store.
pub struct SnapshotStore {
    /// Path to wagers.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl SnapshotStore {
    /// Create a snapshot store in the given data directory, creating the
    /// directory if needed.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: data_dir.join("wagers.json"),
            tmp_path: data_dir.join("wagers.json.tmp"),
        })
    }

    /// Save a snapshot atomically (tmp → rename).
    #[instrument(skip(self, snapshot), fields(wagers = snapshot.wagers.len()))]
    pub async fn save(&self, snapshot: &BookSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .context("Failed to serialize wager snapshot")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp snapshot file")?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename snapshot file")?;

        debug!(path = %self.path.display(), "Wager snapshot saved");
        Ok(())
    }

    /// Load the snapshot; `None` on first startup.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<BookSnapshot>> {
        if !self.path.exists() {
            info!("No wager snapshot found, starting empty");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read wager snapshot")?;

        let snapshot: BookSnapshot =
            serde_json::from_str(&json).context("Failed to parse wager snapshot")?;

        anyhow::ensure!(
            snapshot.version == SNAPSHOT_VERSION,
            "Unsupported snapshot version {}",
            snapshot.version
        );

        info!(
            wagers = snapshot.wagers.len(),
            events = snapshot.events.len(),
            "Wager snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    /// Check if the snapshot file is readable.
    pub async fn is_healthy(&self) -> bool {
        if !self.path.exists() {
            return true; // First run is OK
        }
        fs::metadata(&self.path).await.is_ok()
    }
}
