//! HTTP clients for the matchup data API
//!
//! [`MatchupApi`] is the seam the fetch layer talks to. Two implementations
//! exist: the authenticated analysis API (filters, bearer token) and the
//! older cached endpoints (no filters, no token).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::retry::RetryPolicy;
use super::wire::{
    find_record, ArchetypeMatrixResponse, LegacyMatrixResponse, LegacyRecord, MatrixPayload,
    WinLossRecord,
};
use crate::config::{ApiFlavor, Config};
use crate::error::{Error, Result};
use crate::filter::FilterState;
use crate::stats::ArchetypeAggregate;

const MATRIX_PATH: &str = "/analysis/archetype-matrix";
const RECORDS_PATH: &str = "/analysis/win-loss-records";
const LEGACY_MATRIX_PATH: &str = "/matchup/cached";
const LEGACY_RECORD_PATH: &str = "/archetype/overallrecord";

/// Source of matrix snapshots and per-archetype records
#[async_trait]
pub trait MatchupApi: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn fetch_matrix(&self, filter: &FilterState) -> Result<MatrixPayload>;

    /// Overall record of one archetype under `filter`.
    /// `Err(Error::NoRecord)` when the server has no data for it.
    async fn fetch_record(&self, archetype: &str, filter: &FilterState)
        -> Result<ArchetypeAggregate>;
}

/// Build the client selected by `api.flavor`
pub fn build_client(config: &Config) -> Result<Arc<dyn MatchupApi>> {
    let retry = RetryPolicy::from_config(&config.retry);
    let timeout = config.api.timeout_ms.map(Duration::from_millis);

    let client: Arc<dyn MatchupApi> = match config.api.flavor {
        ApiFlavor::Authenticated => Arc::new(AnalysisClient::new(
            &config.api.base_url,
            config.api.resolve_token(),
            &config.api.token_env,
            timeout,
            retry,
        )?),
        ApiFlavor::Legacy => Arc::new(LegacyClient::new(
            &config.api.legacy_base_url,
            timeout,
            retry,
        )?),
    };
    Ok(client)
}

fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Join `path` onto the base URL, keeping any path prefix the base has
fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", joined, e)))
}

fn parse_base(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| Error::Config(format!("Invalid base URL {}: {}", base_url, e)))
}

/// Map a non-success status to an error
fn status_error(status: StatusCode, body: String) -> Error {
    if status == StatusCode::FORBIDDEN {
        Error::Unauthorized
    } else {
        Error::Api {
            status: status.as_u16(),
            body,
        }
    }
}

/// One GET with JSON decoding; no retries
async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
    bearer: Option<&str>,
    params: &[(&'static str, String)],
) -> Result<T> {
    debug!(url = %url, params = params.len(), "API call");

    let mut request = client.get(url.clone()).query(params);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(url = %url, status = status.as_u16(), "API error: {}", body);
        return Err(status_error(status, body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| Error::Deserialization(format!("{}: {}", url, e)))
}

/// Client for the authenticated analysis endpoints
pub struct AnalysisClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    token_env: String,
    retry: RetryPolicy,
}

impl AnalysisClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        token_env: &str,
        timeout: Option<Duration>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: parse_base(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
            token_env: token_env.to_string(),
            retry,
        })
    }

    fn bearer(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::MissingToken(self.token_env.clone()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        // No token means no request at all
        let token = self.bearer()?;
        let url = endpoint(&self.base_url, path)?;
        self.retry
            .run(path, || get_json(&self.client, &url, Some(token), &params))
            .await
    }
}

#[async_trait]
impl MatchupApi for AnalysisClient {
    fn name(&self) -> &'static str {
        "analysis"
    }

    async fn fetch_matrix(&self, filter: &FilterState) -> Result<MatrixPayload> {
        let response: ArchetypeMatrixResponse =
            self.get(MATRIX_PATH, filter.query_params()).await?;
        Ok(response.into())
    }

    async fn fetch_record(
        &self,
        archetype: &str,
        filter: &FilterState,
    ) -> Result<ArchetypeAggregate> {
        let mut params = vec![("archetype", archetype.to_string())];
        params.extend(filter.query_params());

        let records: Vec<WinLossRecord> = self.get(RECORDS_PATH, params).await?;
        find_record(records, archetype).ok_or_else(|| Error::NoRecord(archetype.to_string()))
    }
}

/// Client for the unauthenticated cached endpoints. Filters are not
/// supported there; requests always cover all time.
pub struct LegacyClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl LegacyClient {
    pub fn new(base_url: &str, timeout: Option<Duration>, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: parse_base(base_url)?,
            retry,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let url = endpoint(&self.base_url, path)?;
        self.retry
            .run(path, || get_json(&self.client, &url, None, &params))
            .await
    }

    fn warn_ignored_filter(filter: &FilterState) {
        if !filter.key().is_default() {
            warn!(key = %filter.key(), "Legacy API ignores filters; fetching all-time data");
        }
    }
}

#[async_trait]
impl MatchupApi for LegacyClient {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn fetch_matrix(&self, filter: &FilterState) -> Result<MatrixPayload> {
        Self::warn_ignored_filter(filter);
        let response: LegacyMatrixResponse = self.get(LEGACY_MATRIX_PATH, Vec::new()).await?;
        Ok(response.into())
    }

    async fn fetch_record(
        &self,
        archetype: &str,
        _filter: &FilterState,
    ) -> Result<ArchetypeAggregate> {
        let record: Option<LegacyRecord> = self
            .get(LEGACY_RECORD_PATH, vec![("archetype", archetype.to_string())])
            .await?;
        record
            .map(ArchetypeAggregate::from)
            .ok_or_else(|| Error::NoRecord(archetype.to_string()))
    }
}
