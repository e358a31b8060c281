//! On-disk snapshot of the default view, reused across restarts
//!
//! Only the all-time, unfiltered entry is stored. A snapshot older than
//! the freshness window is deleted and refetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::CacheEntry;
use crate::config::SnapshotConfig;
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot {
    saved_at: DateTime<Utc>,
    entry: CacheEntry,
}

pub struct SnapshotStore {
    path: PathBuf,
    ttl: Duration,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(path: P, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// `None` when snapshots are disabled
    pub fn from_config(config: &SnapshotConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(Self::new(
            &config.path,
            Duration::from_secs(config.ttl_secs),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load_fresh(&self) -> Result<Option<CacheEntry>> {
        self.load_fresh_at(Utc::now()).await
    }

    /// Load the snapshot if it is younger than the freshness window at `now`
    pub async fn load_fresh_at(&self, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let stored: StoredSnapshot = match serde_json::from_str(&data) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), "Discarding unreadable snapshot: {}", e);
                self.clear().await?;
                return Ok(None);
            }
        };

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| Error::Snapshot(format!("invalid ttl: {}", e)))?;
        let age = now.signed_duration_since(stored.saved_at);

        if age < chrono::Duration::zero() || age >= ttl {
            debug!(age_secs = age.num_seconds(), "Snapshot expired");
            self.clear().await?;
            return Ok(None);
        }

        info!(
            key = %stored.entry.key,
            age_secs = age.num_seconds(),
            "Using stored snapshot"
        );
        Ok(Some(stored.entry))
    }

    pub async fn save(&self, entry: &CacheEntry) -> Result<()> {
        self.save_at(entry, Utc::now()).await
    }

    pub async fn save_at(&self, entry: &CacheEntry, saved_at: DateTime<Utc>) -> Result<()> {
        if !entry.key.is_default() {
            debug!(key = %entry.key, "Not persisting non-default snapshot");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        let stored = StoredSnapshot {
            saved_at,
            entry: entry.clone(),
        };
        let data = serde_json::to_string(&stored)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, e: std::io::Error) -> Error {
        Error::Snapshot(format!("{}: {}", self.path.display(), e))
    }
}
