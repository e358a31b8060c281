//! Fetch coordination
//!
//! One fetch attempt is the matrix call followed by one record call per
//! archetype, issued concurrently and joined. The attempt either yields a
//! complete [`CacheEntry`] or fails as a whole; nothing partial reaches
//! the cache.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::MatchupApi;
use crate::cache::{CacheEntry, MatrixCache};
use crate::error::{Error, Result};
use crate::filter::FilterState;
use crate::stats::ArchetypeAggregate;
use crate::view::{sort_archetypes, SortDirection, SortMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Blocking: the caller has nothing to show until it finishes
    Foreground,
    /// Non-blocking: the previous view stays up meanwhile
    Background,
}

/// In-flight fetch counters behind the loading and refreshing flags
#[derive(Debug, Default)]
pub struct FetchStatus {
    loading: AtomicUsize,
    refreshing: AtomicUsize,
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst) > 0
    }

    fn counter(&self, mode: FetchMode) -> &AtomicUsize {
        match mode {
            FetchMode::Foreground => &self.loading,
            FetchMode::Background => &self.refreshing,
        }
    }
}

/// Raises a status flag for its lifetime; dropping it lowers the flag on
/// every exit path, errors and panics included.
pub struct StatusGuard {
    status: Arc<FetchStatus>,
    mode: FetchMode,
}

impl StatusGuard {
    fn new(status: Arc<FetchStatus>, mode: FetchMode) -> Self {
        status.counter(mode).fetch_add(1, Ordering::SeqCst);
        Self { status, mode }
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.status.counter(self.mode).fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FetchCoordinator {
    api: Arc<dyn MatchupApi>,
    cache: Arc<MatrixCache>,
    status: Arc<FetchStatus>,
}

impl FetchCoordinator {
    pub fn new(api: Arc<dyn MatchupApi>, cache: Arc<MatrixCache>) -> Self {
        Self {
            api,
            cache,
            status: Arc::new(FetchStatus::default()),
        }
    }

    pub fn cache(&self) -> &Arc<MatrixCache> {
        &self.cache
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// Fetch a complete snapshot for `filter` without touching the cache
    pub async fn fetch_snapshot(&self, filter: &FilterState) -> Result<CacheEntry> {
        let key = filter.key();
        debug!(key = %key, api = self.api.name(), "Fetching matrix");

        let payload = self.api.fetch_matrix(filter).await?;

        let requests = payload.archetypes.iter().map(|archetype| async move {
            let outcome = self.api.fetch_record(archetype, filter).await;
            (archetype, outcome)
        });
        let outcomes = join_all(requests).await;

        let mut aggregates = HashMap::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (archetype, outcome) in outcomes {
            match outcome {
                Ok(record) => {
                    aggregates.insert(archetype.clone(), record);
                }
                Err(e) if e.is_sparse_data() => {
                    debug!(archetype = %archetype, "No record in period, using zero record");
                    aggregates.insert(archetype.clone(), ArchetypeAggregate::zero());
                }
                Err(e) => failures.push(format!("{}: {}", archetype, e)),
            }
        }

        if !failures.is_empty() {
            return Err(Error::PartialFailure(failures));
        }

        let archetypes = sort_archetypes(
            SortMethod::Games,
            SortDirection::Desc,
            &payload.archetypes,
            &aggregates,
        );

        info!(key = %key, archetypes = archetypes.len(), "Fetched matrix snapshot");

        Ok(CacheEntry {
            key,
            matrix: payload.matrix,
            aggregates,
            archetypes,
            period: payload.period,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch and cache, raising the flag for `mode` meanwhile
    pub async fn load(&self, filter: &FilterState, mode: FetchMode) -> Result<Arc<CacheEntry>> {
        let _guard = StatusGuard::new(Arc::clone(&self.status), mode);
        self.fetch_and_store(filter, mode).await
    }

    /// Start a background load. The refreshing flag is raised before this
    /// returns, not when the task first runs.
    pub fn spawn_background(
        self: &Arc<Self>,
        filter: FilterState,
    ) -> JoinHandle<Result<Arc<CacheEntry>>> {
        let guard = StatusGuard::new(Arc::clone(&self.status), FetchMode::Background);
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            coordinator
                .fetch_and_store(&filter, FetchMode::Background)
                .await
        })
    }

    async fn fetch_and_store(
        &self,
        filter: &FilterState,
        mode: FetchMode,
    ) -> Result<Arc<CacheEntry>> {
        match self.fetch_snapshot(filter).await {
            Ok(entry) => Ok(self.cache.put(entry)),
            Err(e) => {
                match mode {
                    FetchMode::Foreground => error!(key = %filter.key(), "Fetch failed: {}", e),
                    FetchMode::Background => warn!(key = %filter.key(), "Background fetch failed: {}", e),
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, Fixture};
    use crate::filter::TimeFrame;
    use std::time::Duration;

    fn coordinator(api: FakeApi) -> (Arc<FetchCoordinator>, Arc<FakeApi>) {
        let api = Arc::new(api);
        let coordinator = FetchCoordinator::new(api.clone(), Arc::new(MatrixCache::new()));
        (Arc::new(coordinator), api)
    }

    #[tokio::test]
    async fn test_fetch_snapshot_orders_by_games() {
        let filter = FilterState::default();
        let (coordinator, api) = coordinator(FakeApi::new().with(
            &filter,
            Fixture::new(&["Control", "Burn", "Tempo"])
                .cell("Burn", "Control", 7, 3)
                .record("Control", 5, 5)
                .record("Burn", 30, 10)
                .record("Tempo", 4, 6),
        ));

        let entry = coordinator.fetch_snapshot(&filter).await.unwrap();
        // Control and Tempo tie at 10 games and keep input order
        assert_eq!(entry.archetypes, vec!["Burn", "Control", "Tempo"]);
        assert_eq!(entry.key, filter.key());
        assert_eq!(api.matrix_calls(), 1);
        assert_eq!(api.record_calls(), 3);
        // fetch_snapshot alone never caches
        assert!(coordinator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_record_calls_run_concurrently() {
        let filter = FilterState::default();
        let names = ["A", "B", "C", "D", "E"];
        let fixture = names
            .iter()
            .fold(Fixture::new(&names), |fixture, name| fixture.record(name, 1, 1))
            .delayed_records(Duration::from_millis(100));
        let (coordinator, api) = coordinator(FakeApi::new().with(&filter, fixture));

        let started = std::time::Instant::now();
        let entry = coordinator.fetch_snapshot(&filter).await.unwrap();

        assert_eq!(entry.archetypes.len(), names.len());
        assert_eq!(api.record_calls(), names.len());
        // All record calls were pending together
        assert_eq!(api.peak_records_in_flight(), names.len());
        // Sequential calls would need 500ms
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_missing_record_is_zero_aggregate() {
        let filter = FilterState::default();
        let (coordinator, _) = coordinator(FakeApi::new().with(
            &filter,
            Fixture::new(&["A", "B"]).cell("A", "B", 7, 3).record("B", 3, 7),
        ));

        let entry = coordinator
            .load(&filter, FetchMode::Foreground)
            .await
            .unwrap();
        assert_eq!(entry.total_aggregate("A"), ArchetypeAggregate::zero());
        assert_eq!(entry.aggregates.get("A"), Some(&ArchetypeAggregate::zero()));
        assert!(coordinator.cache().contains(&filter.key()));
    }

    #[tokio::test]
    async fn test_partial_failure_commits_nothing() {
        let filter = FilterState::new(TimeFrame::SixMonths);
        let (coordinator, _) = coordinator(FakeApi::new().with(
            &filter,
            Fixture::new(&["A", "B", "C"])
                .record("A", 1, 1)
                .failing_record("B", "boom")
                .failing_record("C", "bang"),
        ));

        let err = coordinator
            .load(&filter, FetchMode::Foreground)
            .await
            .unwrap_err();
        match &err {
            Error::PartialFailure(lines) => {
                assert_eq!(lines.len(), 2);
                assert!(lines.contains(&"B: API error: 500 - boom".to_string()));
                assert!(lines.contains(&"C: API error: 500 - bang".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Failed to fetch some win rates:\n"));
        assert!(coordinator.cache().is_empty());
        assert!(!coordinator.status().is_loading());
    }

    #[tokio::test]
    async fn test_matrix_failure_is_terminal() {
        let filter = FilterState::default();
        let (coordinator, api) =
            coordinator(FakeApi::new().with(&filter, Fixture::failing_matrix()));

        let err = coordinator
            .load(&filter, FetchMode::Foreground)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(api.record_calls(), 0);
        assert!(coordinator.cache().is_empty());
        assert!(!coordinator.status().is_loading());
    }

    #[tokio::test]
    async fn test_background_flag_lifecycle() {
        let filter = FilterState::new(TimeFrame::OneYear);
        let (coordinator, _) = coordinator(FakeApi::new().with(
            &filter,
            Fixture::new(&["A"])
                .record("A", 1, 0)
                .delayed(Duration::from_millis(20)),
        ));

        let handle = coordinator.spawn_background(filter.clone());
        assert!(coordinator.status().is_refreshing());
        assert!(!coordinator.status().is_loading());

        let entry = handle.await.unwrap().unwrap();
        assert_eq!(entry.key, filter.key());
        assert!(!coordinator.status().is_refreshing());
        assert!(coordinator.cache().contains(&filter.key()));
    }

    #[test]
    fn test_guard_counts_overlapping_fetches() {
        let status = Arc::new(FetchStatus::default());
        let first = StatusGuard::new(status.clone(), FetchMode::Background);
        let second = StatusGuard::new(status.clone(), FetchMode::Background);
        drop(first);
        assert!(status.is_refreshing());
        drop(second);
        assert!(!status.is_refreshing());
    }
}
