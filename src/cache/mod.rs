//! Filter-keyed cache of fetched matrix snapshots
//!
//! Each distinct filter combination owns one immutable entry. Entries are
//! never evicted during a session; the set of reachable keys is small
//! (time frames x cutoffs x ranges actually visited).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::filter::TimeFrame;
use crate::matrix::MatchupMatrix;
use crate::stats::{total_aggregate, ArchetypeAggregate};

pub mod snapshot;

pub use snapshot::SnapshotStore;

const NO_PERCENTAGE: &str = "none";

/// Canonical identifier of one filter combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterKey(String);

impl FilterKey {
    /// `custom-{start}-{end}-{tf}-{pct}` when both dates are present,
    /// otherwise `{tf}-{pct}`; `pct` is the number or `none`.
    pub fn compute(
        time_frame: TimeFrame,
        min_percentage: Option<f64>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Self {
        let pct = min_percentage
            .map(|p| p.to_string())
            .unwrap_or_else(|| NO_PERCENTAGE.to_string());

        match (start_date, end_date) {
            (Some(start), Some(end)) => {
                FilterKey(format!("custom-{}-{}-{}-{}", start, end, time_frame, pct))
            }
            _ => FilterKey(format!("{}-{}", time_frame, pct)),
        }
    }

    /// Key of the startup view: all time, no cutoff, no range
    pub fn default_key() -> Self {
        Self::compute(TimeFrame::AllTime, None, None, None)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default_key()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Period metadata as resolved by the server (may differ from the request)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPeriod {
    pub time_frame: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_percentage: Option<f64>,
}

/// One fetched, fully resolved snapshot. Immutable once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: FilterKey,
    pub matrix: MatchupMatrix,
    pub aggregates: HashMap<String, ArchetypeAggregate>,
    /// Archetypes ordered by games played, descending
    pub archetypes: Vec<String>,
    pub period: ResolvedPeriod,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn total_aggregate(&self, archetype: &str) -> ArchetypeAggregate {
        total_aggregate(&self.aggregates, archetype)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Per-filter snapshot store
#[derive(Default)]
pub struct MatrixCache {
    entries: DashMap<FilterKey, Arc<CacheEntry>>,
    stats: CacheStats,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry, counting the hit or miss
    pub fn get(&self, key: &FilterKey) -> Option<Arc<CacheEntry>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn contains(&self, key: &FilterKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace the entry stored under `entry.key`
    pub fn put(&self, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        tracing::debug!(key = %entry.key, archetypes = entry.archetypes.len(), "Caching snapshot");
        self.entries.insert(entry.key.clone(), Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<FilterKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
pub(crate) fn test_entry(key: FilterKey, archetypes: &[&str]) -> CacheEntry {
    CacheEntry {
        key,
        matrix: MatchupMatrix::new(),
        aggregates: HashMap::new(),
        archetypes: archetypes.iter().map(|a| a.to_string()).collect(),
        period: ResolvedPeriod::default(),
        fetched_at: Utc::now(),
    }
}
