//! In-memory [`MatchupApi`] for tests
//!
//! Fixtures are keyed by [`FilterKey`]; call counters let tests assert
//! whether the network would have been touched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::MatchupApi;
use super::wire::MatrixPayload;
use crate::cache::{FilterKey, ResolvedPeriod};
use crate::error::{Error, Result};
use crate::filter::FilterState;
use crate::matrix::{MatchupCell, MatchupMatrix};
use crate::stats::ArchetypeAggregate;

#[derive(Debug, Clone)]
enum FakeRecord {
    Found(ArchetypeAggregate),
    Fail(String),
}

/// Canned responses for one filter key
#[derive(Debug, Clone, Default)]
pub(crate) struct Fixture {
    /// `None` makes the matrix call fail
    payload: Option<MatrixPayload>,
    records: HashMap<String, FakeRecord>,
    delay: Duration,
    record_delay: Duration,
}

impl Fixture {
    pub(crate) fn new(archetypes: &[&str]) -> Self {
        Self {
            payload: Some(MatrixPayload {
                archetypes: archetypes.iter().map(|a| a.to_string()).collect(),
                matrix: MatchupMatrix::new(),
                period: ResolvedPeriod {
                    time_frame: "all_time".into(),
                    ..Default::default()
                },
            }),
            ..Default::default()
        }
    }

    pub(crate) fn failing_matrix() -> Self {
        Self::default()
    }

    pub(crate) fn cell(mut self, archetype: &str, opponent: &str, wins: u64, losses: u64) -> Self {
        if let Some(payload) = self.payload.as_mut() {
            payload
                .matrix
                .insert(archetype, opponent, MatchupCell::new(wins, losses, 0));
        }
        self
    }

    pub(crate) fn record(mut self, archetype: &str, wins: u64, losses: u64) -> Self {
        self.records.insert(
            archetype.to_string(),
            FakeRecord::Found(ArchetypeAggregate::from_counts(wins, losses, 0)),
        );
        self
    }

    pub(crate) fn failing_record(mut self, archetype: &str, message: &str) -> Self {
        self.records
            .insert(archetype.to_string(), FakeRecord::Fail(message.to_string()));
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every record call sleeps for `delay` before answering
    pub(crate) fn delayed_records(mut self, delay: Duration) -> Self {
        self.record_delay = delay;
        self
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    fixtures: Mutex<HashMap<FilterKey, Fixture>>,
    matrix_calls: AtomicUsize,
    record_calls: AtomicUsize,
    records_in_flight: AtomicUsize,
    peak_records_in_flight: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(self, filter: &FilterState, fixture: Fixture) -> Self {
        self.set(filter, fixture);
        self
    }

    pub(crate) fn set(&self, filter: &FilterState, fixture: Fixture) {
        if let Ok(mut fixtures) = self.fixtures.lock() {
            fixtures.insert(filter.key(), fixture);
        }
    }

    pub(crate) fn matrix_calls(&self) -> usize {
        self.matrix_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    /// Highest number of record calls that were pending at the same time
    pub(crate) fn peak_records_in_flight(&self) -> usize {
        self.peak_records_in_flight.load(Ordering::SeqCst)
    }

    fn fixture(&self, filter: &FilterState) -> Result<Fixture> {
        let key = filter.key();
        self.fixtures
            .lock()
            .map_err(|_| Error::Internal("fixture lock poisoned".into()))?
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                body: format!("no fixture for {}", key),
            })
    }
}

#[async_trait]
impl MatchupApi for FakeApi {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_matrix(&self, filter: &FilterState) -> Result<MatrixPayload> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        let fixture = self.fixture(filter)?;
        if !fixture.delay.is_zero() {
            tokio::time::sleep(fixture.delay).await;
        }
        fixture
            .payload
            .ok_or_else(|| Error::Transport("connection refused".into()))
    }

    async fn fetch_record(
        &self,
        archetype: &str,
        filter: &FilterState,
    ) -> Result<ArchetypeAggregate> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        let fixture = self.fixture(filter)?;

        let pending = self.records_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_records_in_flight.fetch_max(pending, Ordering::SeqCst);
        if !fixture.record_delay.is_zero() {
            tokio::time::sleep(fixture.record_delay).await;
        }
        self.records_in_flight.fetch_sub(1, Ordering::SeqCst);

        match fixture.records.get(archetype) {
            Some(FakeRecord::Found(agg)) => Ok(*agg),
            Some(FakeRecord::Fail(message)) => Err(Error::Api {
                status: 500,
                body: message.clone(),
            }),
            None => Err(Error::NoRecord(archetype.to_string())),
        }
    }
}
