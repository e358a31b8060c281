//! Top-level view controller
//!
//! Owns the per-filter cache, the fetch coordinator, the optional startup
//! snapshot store and the view state. Filter changes are served from the
//! cache when possible; misses keep the current view on screen while a
//! background fetch runs. Only a result whose key matches the current
//! filter is ever published.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::MatchupApi;
use crate::cache::{CacheEntry, FilterKey, MatrixCache, SnapshotStore};
use crate::error::{Error, Result};
use crate::fetch::{FetchCoordinator, FetchMode};
use crate::filter::TimeFrame;
use crate::stats::WinrateOption;
use crate::view::projection::{project, MatrixView};
use crate::view::sort::{SortDirection, SortMethod};
use crate::view::state::{MatrixViewMode, ViewState};

/// What a filter change did to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Same key as what is on screen
    Unchanged,
    /// Swapped in a cached snapshot, no network call
    CacheHit,
    /// A background fetch is running for the new key
    Refreshing,
}

struct PendingFetch {
    key: FilterKey,
    handle: JoinHandle<Result<Arc<CacheEntry>>>,
}

pub struct Dashboard {
    cache: Arc<MatrixCache>,
    coordinator: Arc<FetchCoordinator>,
    snapshots: Option<SnapshotStore>,
    state: ViewState,
    display: Option<Arc<CacheEntry>>,
    /// Foreground failure, shown in place of the matrix
    error: Option<String>,
    /// Background failures, shown alongside the last good view
    notices: Vec<String>,
    pending: Vec<PendingFetch>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn MatchupApi>,
        state: ViewState,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        Self::with_cache(api, Arc::new(MatrixCache::new()), state, snapshots)
    }

    /// Use an externally owned cache
    pub fn with_cache(
        api: Arc<dyn MatchupApi>,
        cache: Arc<MatrixCache>,
        state: ViewState,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        let coordinator = Arc::new(FetchCoordinator::new(api, Arc::clone(&cache)));
        Self {
            cache,
            coordinator,
            snapshots,
            state,
            display: None,
            error: None,
            notices: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// First load: the stored snapshot for the default view if it is still
    /// fresh, otherwise a foreground fetch.
    pub async fn initialize(&mut self) -> Result<()> {
        let filter = self.state.filter.clone();
        let key = filter.key();

        if let Some(entry) = self.cache.get(&key) {
            self.publish(entry);
            return Ok(());
        }

        if key.is_default() {
            if let Some(store) = &self.snapshots {
                match store.load_fresh().await {
                    Ok(Some(entry)) => {
                        let entry = self.cache.put(entry);
                        self.publish(entry);
                        return Ok(());
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Ignoring stored snapshot: {}", e),
                }
            }
        }

        match self.coordinator.load(&filter, FetchMode::Foreground).await {
            Ok(entry) => {
                self.persist(&entry).await;
                self.publish(entry);
                Ok(())
            }
            Err(e) => {
                error!(key = %key, "Initial load failed: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn set_time_frame(&mut self, time_frame: TimeFrame) -> FilterChange {
        self.state.filter.time_frame = time_frame;
        self.apply_filter()
    }

    pub fn set_min_percentage(&mut self, percentage: Option<f64>) -> FilterChange {
        self.state.filter.set_min_percentage(percentage);
        self.apply_filter()
    }

    pub fn set_date_range(&mut self, start: Option<&str>, end: Option<&str>) -> Result<FilterChange> {
        self.state.filter.set_date_range(start, end)?;
        Ok(self.apply_filter())
    }

    pub fn clear_date_range(&mut self) -> FilterChange {
        self.state.filter.clear_date_range();
        self.apply_filter()
    }

    fn apply_filter(&mut self) -> FilterChange {
        let key = self.state.filter.key();

        if self.displayed_key() == Some(&key) {
            return FilterChange::Unchanged;
        }

        if let Some(entry) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            self.publish(entry);
            return FilterChange::CacheHit;
        }

        if self.pending.iter().any(|p| p.key == key) {
            debug!(key = %key, "Fetch already in flight");
            return FilterChange::Refreshing;
        }

        info!(key = %key, "Cache miss, refreshing in background");
        let handle = self
            .coordinator
            .spawn_background(self.state.filter.clone());
        self.pending.push(PendingFetch { key, handle });
        FilterChange::Refreshing
    }

    /// Apply background fetches that have already finished
    pub async fn poll(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|p| p.handle.is_finished());
        self.pending = running;

        for fetch in done {
            self.complete(fetch).await;
        }
    }

    /// Wait for every in-flight background fetch and apply the results
    pub async fn settle(&mut self) {
        let pending: Vec<_> = self.pending.drain(..).collect();
        for fetch in pending {
            self.complete(fetch).await;
        }
    }

    async fn complete(&mut self, fetch: PendingFetch) {
        let current = self.state.filter.key();
        let outcome = match fetch.handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Internal(format!("fetch task failed: {}", e))),
        };

        match outcome {
            Ok(entry) => {
                self.persist(&entry).await;
                if entry.key == current {
                    self.publish(entry);
                } else {
                    debug!(key = %fetch.key, current = %current, "Discarding stale result");
                }
            }
            Err(e) if fetch.key == current => {
                warn!(key = %fetch.key, "Keeping previous view: {}", e);
                self.notices.push(e.to_string());
            }
            Err(e) => {
                warn!(key = %fetch.key, "Stale background fetch failed: {}", e);
            }
        }
    }

    fn publish(&mut self, entry: Arc<CacheEntry>) {
        self.state.adopt(&entry);
        self.display = Some(entry);
        self.error = None;
    }

    async fn persist(&self, entry: &CacheEntry) {
        if !entry.key.is_default() {
            return;
        }
        if let Some(store) = &self.snapshots {
            if let Err(e) = store.save(entry).await {
                warn!("Failed to store snapshot: {}", e);
            }
        }
    }

    pub fn handle_sort(&mut self, method: SortMethod) {
        let empty = HashMap::new();
        let aggregates = self.display.as_ref().map_or(&empty, |e| &e.aggregates);
        self.state.handle_sort(method, aggregates);
    }

    pub fn sort_by(&mut self, method: SortMethod, direction: SortDirection) {
        let empty = HashMap::new();
        let aggregates = self.display.as_ref().map_or(&empty, |e| &e.aggregates);
        self.state.sort_by(method, direction, aggregates);
    }

    pub fn set_visible(&mut self, archetype: &str, visible: bool) -> bool {
        let empty = HashMap::new();
        let aggregates = self.display.as_ref().map_or(&empty, |e| &e.aggregates);
        self.state.set_visible(archetype, visible, aggregates)
    }

    pub fn set_visible_set<S: AsRef<str>>(&mut self, archetypes: &[S]) {
        let empty = HashMap::new();
        let aggregates = self.display.as_ref().map_or(&empty, |e| &e.aggregates);
        self.state.set_visible_set(archetypes, aggregates);
    }

    pub fn select_all(&mut self, selected: bool) {
        self.state.select_all(selected);
    }

    pub fn set_view_mode(&mut self, mode: MatrixViewMode) {
        self.state.set_view_mode(mode);
    }

    pub fn set_winrate_option(&mut self, option: WinrateOption) {
        self.state.set_winrate_option(option);
    }

    /// Projection of what is on screen, `None` before the first load
    pub fn matrix_view(&self) -> Option<MatrixView> {
        self.display.as_ref().map(|entry| project(entry, &self.state))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn displayed(&self) -> Option<&Arc<CacheEntry>> {
        self.display.as_ref()
    }

    fn displayed_key(&self) -> Option<&FilterKey> {
        self.display.as_ref().map(|e| &e.key)
    }

    pub fn cache(&self) -> &Arc<MatrixCache> {
        &self.cache
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.status().is_loading()
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.status().is_refreshing()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, Fixture};
    use crate::filter::FilterState;
    use std::time::Duration;

    fn all_time() -> FilterState {
        FilterState::default()
    }

    fn base_fixture() -> Fixture {
        Fixture::new(&["A", "B", "C"])
            .cell("A", "B", 7, 3)
            .record("A", 30, 10)
            .record("B", 20, 20)
            .record("C", 5, 5)
    }

    fn dashboard(api: &Arc<FakeApi>) -> Dashboard {
        Dashboard::new(api.clone(), ViewState::default(), None)
    }

    #[tokio::test]
    async fn test_initialize_foreground() {
        let api = Arc::new(FakeApi::new().with(&all_time(), base_fixture()));
        let mut dashboard = dashboard(&api);

        dashboard.initialize().await.unwrap();
        assert!(!dashboard.is_loading());
        assert!(dashboard.error().is_none());
        assert_eq!(dashboard.state().visible(), ["A", "B", "C"]);

        let view = dashboard.matrix_view().unwrap();
        assert_eq!(view.rows.len(), 3);
    }

    #[tokio::test]
    async fn test_initialize_failure_sets_error() {
        let api = Arc::new(FakeApi::new().with(&all_time(), Fixture::failing_matrix()));
        let mut dashboard = dashboard(&api);

        assert!(dashboard.initialize().await.is_err());
        assert!(dashboard.error().unwrap().contains("connection refused"));
        assert!(dashboard.matrix_view().is_none());
        assert!(!dashboard.is_loading());
        assert!(dashboard.cache().is_empty());
    }

    #[tokio::test]
    async fn test_percentage_round_trip_hits_cache() {
        let five = all_time().with_min_percentage(Some(5.0));
        let api = Arc::new(
            FakeApi::new()
                .with(&all_time(), base_fixture())
                .with(&five, Fixture::new(&["A", "B"]).record("A", 3, 1).record("B", 1, 3)),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        assert_eq!(dashboard.set_min_percentage(Some(5.0)), FilterChange::Refreshing);
        dashboard.settle().await;
        assert_eq!(dashboard.displayed().unwrap().key, five.key());
        assert_eq!(api.matrix_calls(), 2);

        assert_eq!(dashboard.set_min_percentage(None), FilterChange::CacheHit);
        assert_eq!(dashboard.set_min_percentage(Some(5.0)), FilterChange::CacheHit);
        assert_eq!(dashboard.set_min_percentage(Some(5.0)), FilterChange::Unchanged);
        assert_eq!(api.matrix_calls(), 2);
    }

    #[tokio::test]
    async fn test_miss_keeps_previous_view_while_refreshing() {
        let three_months = FilterState::new(TimeFrame::ThreeMonths);
        let api = Arc::new(
            FakeApi::new().with(&all_time(), base_fixture()).with(
                &three_months,
                Fixture::new(&["A"])
                    .record("A", 1, 1)
                    .delayed(Duration::from_millis(30)),
            ),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        assert_eq!(
            dashboard.set_time_frame(TimeFrame::ThreeMonths),
            FilterChange::Refreshing
        );
        assert!(dashboard.is_refreshing());
        assert!(!dashboard.is_loading());
        assert_eq!(dashboard.displayed().unwrap().key, all_time().key());

        dashboard.settle().await;
        assert!(!dashboard.is_refreshing());
        assert_eq!(dashboard.displayed().unwrap().key, three_months.key());
    }

    #[tokio::test]
    async fn test_stale_result_not_published() {
        let three_months = FilterState::new(TimeFrame::ThreeMonths);
        let one_year = FilterState::new(TimeFrame::OneYear);
        let api = Arc::new(
            FakeApi::new()
                .with(&all_time(), base_fixture())
                .with(
                    &three_months,
                    Fixture::new(&["A", "B"])
                        .record("A", 1, 1)
                        .record("B", 1, 1)
                        .delayed(Duration::from_millis(50)),
                )
                .with(&one_year, Fixture::new(&["A"]).record("A", 2, 2)),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        dashboard.set_time_frame(TimeFrame::ThreeMonths);
        dashboard.set_time_frame(TimeFrame::OneYear);
        dashboard.settle().await;

        assert_eq!(dashboard.displayed().unwrap().key, one_year.key());
        // The slow result is still cached under its own key
        assert!(dashboard.cache().contains(&three_months.key()));
        assert_eq!(
            dashboard.set_time_frame(TimeFrame::ThreeMonths),
            FilterChange::CacheHit
        );
    }

    #[tokio::test]
    async fn test_background_failure_becomes_notice() {
        let six_months = FilterState::new(TimeFrame::SixMonths);
        let api = Arc::new(
            FakeApi::new()
                .with(&all_time(), base_fixture())
                .with(&six_months, Fixture::new(&["A"]).failing_record("A", "boom")),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        dashboard.set_time_frame(TimeFrame::SixMonths);
        dashboard.settle().await;

        assert_eq!(dashboard.displayed().unwrap().key, all_time().key());
        assert!(dashboard.error().is_none());
        let notices = dashboard.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Failed to fetch some win rates:"));
        assert!(dashboard.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_miss_does_not_double_fetch() {
        let one_year = FilterState::new(TimeFrame::OneYear);
        let api = Arc::new(
            FakeApi::new().with(&all_time(), base_fixture()).with(
                &one_year,
                Fixture::new(&["A"])
                    .record("A", 1, 0)
                    .delayed(Duration::from_millis(30)),
            ),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        dashboard.set_time_frame(TimeFrame::OneYear);
        dashboard.set_time_frame(TimeFrame::AllTime);
        dashboard.set_time_frame(TimeFrame::OneYear);
        dashboard.settle().await;

        assert_eq!(api.matrix_calls(), 2);
        assert_eq!(dashboard.displayed().unwrap().key, one_year.key());
    }

    #[tokio::test]
    async fn test_half_open_range_is_unchanged() {
        let api = Arc::new(FakeApi::new().with(&all_time(), base_fixture()));
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        let change = dashboard.set_date_range(Some("2024-01-01"), None).unwrap();
        assert_eq!(change, FilterChange::Unchanged);
        assert!(dashboard
            .set_date_range(Some("2024-02-01"), Some("2024-01-01"))
            .is_err());
    }

    #[tokio::test]
    async fn test_snapshot_shortcut_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let api = Arc::new(FakeApi::new().with(&all_time(), base_fixture()));
        let store = SnapshotStore::new(&path, Duration::from_secs(300));
        let mut first = Dashboard::new(api.clone(), ViewState::default(), Some(store));
        first.initialize().await.unwrap();
        assert!(path.exists());

        let offline = Arc::new(FakeApi::new());
        let store = SnapshotStore::new(&path, Duration::from_secs(300));
        let mut second = Dashboard::new(offline.clone(), ViewState::default(), Some(store));
        second.initialize().await.unwrap();

        assert_eq!(offline.matrix_calls(), 0);
        assert_eq!(second.state().archetypes(), first.state().archetypes());
    }

    #[tokio::test]
    async fn test_poll_applies_finished_fetches() {
        let one_month = FilterState::new(TimeFrame::OneMonth);
        let api = Arc::new(
            FakeApi::new()
                .with(&all_time(), base_fixture())
                .with(&one_month, Fixture::new(&["B"]).record("B", 2, 1)),
        );
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        dashboard.set_time_frame(TimeFrame::OneMonth);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            dashboard.poll().await;
            if !dashboard.is_refreshing() && dashboard.displayed().unwrap().key == one_month.key() {
                break;
            }
        }
        assert_eq!(dashboard.displayed().unwrap().key, one_month.key());
        assert_eq!(dashboard.state().visible(), ["B"]);
    }

    #[tokio::test]
    async fn test_sort_and_visibility_passthrough() {
        let api = Arc::new(FakeApi::new().with(&all_time(), base_fixture()));
        let mut dashboard = dashboard(&api);
        dashboard.initialize().await.unwrap();

        dashboard.handle_sort(SortMethod::Alpha);
        assert_eq!(dashboard.state().visible(), ["C", "B", "A"]);
        dashboard.handle_sort(SortMethod::Alpha);
        assert_eq!(dashboard.state().visible(), ["A", "B", "C"]);

        assert!(dashboard.set_visible("B", false));
        dashboard.set_view_mode(MatrixViewMode::FilteredVsFiltered);
        let view = dashboard.matrix_view().unwrap();
        assert_eq!(view.columns, vec!["A", "C"]);
    }
}
