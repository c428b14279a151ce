//! Settlement Log - Append-only JSONL Audit Trail
//!
//! Every applied transition is appended to `settlements/YYYY-MM-DD.jsonl`
//! (UTC date of the commit). Each line is one `SettlementRecord`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::ports::repository::SettlementRecord;

/// Append-only JSONL settlement logger with daily file rotation.
pub struct SettlementLog {
    dir: PathBuf,
}

impl SettlementLog {
    /// Create the log under `<data_dir>/settlements`.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("settlements");
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create settlements directory")?;
        Ok(Self { dir })
    }

    /// Append one record to the file for its settlement date.
    #[instrument(skip(self, record), fields(wager_id = %record.wager_id))]
    pub async fn append(&self, record: &SettlementRecord) -> Result<()> {
        let date = record.settled_at.format("%Y-%m-%d").to_string();
        let path = self.dir.join(format!("{date}.jsonl"));

        let mut json =
            serde_json::to_string(record).context("Failed to serialize settlement record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open settlement log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write settlement record")?;
        file.flush().await.context("Failed to flush settlement log")?;

        Ok(())
    }

    /// Load every record across all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<SettlementRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<SettlementRecord>(line) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!(
                            file = %path.display(),
                            error = %e,
                            "Skipping malformed settlement record"
                        ),
                    }
                }
            }
        }

        records.sort_by_key(|r| r.settled_at);
        info!(count = records.len(), "Loaded settlement records");
        Ok(records)
    }

    /// Check if the settlements directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }
}
