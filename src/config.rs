//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::filter::TimeFrame;
use crate::stats::WinrateOption;
use crate::view::{MatrixViewMode, SortDirection, SortMethod};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// Which upstream collaborator to talk to
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// Bearer-token API with time frame and cutoff support
    Authenticated,
    /// Unauthenticated cached endpoints, no filters
    Legacy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; falls back to the `token_env` variable when unset
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_flavor")]
    pub flavor: ApiFlavor,
    #[serde(default = "default_legacy_base_url")]
    pub legacy_base_url: String,
    /// Request timeout; unset keeps the transport default
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ApiConfig {
    /// Resolve the bearer token from config, then from the environment
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(&self.token_env).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Fixed-attempt, fixed-delay retry applied to every request
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_path")]
    pub path: String,
    /// Freshness window in seconds
    #[serde(default = "default_snapshot_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_snapshot_path(),
            ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

/// Startup view defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub time_frame: TimeFrame,
    #[serde(default)]
    pub sort_method: SortMethod,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub view_mode: MatrixViewMode,
    #[serde(default)]
    pub winrate: WinrateOption,
}

fn default_base_url() -> String {
    "https://mtg-data-ai.fly.dev".to_string()
}

fn default_legacy_base_url() -> String {
    "https://mtg-data.fly.dev".to_string()
}

fn default_token_env() -> String {
    "METAGAME_JWT_TOKEN".to_string()
}

fn default_flavor() -> ApiFlavor {
    ApiFlavor::Authenticated
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_snapshot_path() -> String {
    ".metagame/snapshot.json".to_string()
}

fn default_snapshot_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("api.base_url", default_base_url())?
            .set_default("api.token_env", default_token_env())?
            .set_default("api.flavor", "authenticated")?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix METAGAME_)
            .add_source(
                config::Environment::with_prefix("METAGAME")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid api.base_url: {}", self.api.base_url))?;

        if self.api.flavor == ApiFlavor::Legacy {
            url::Url::parse(&self.api.legacy_base_url).with_context(|| {
                format!("Invalid api.legacy_base_url: {}", self.api.legacy_base_url)
            })?;
        }

        if self.retry.attempts == 0 {
            anyhow::bail!("retry.attempts must be at least 1");
        }

        if self.snapshot.enabled && self.snapshot.ttl_secs == 0 {
            anyhow::bail!("snapshot.ttl_secs must be positive when snapshots are enabled");
        }

        if self.api.flavor == ApiFlavor::Authenticated && self.api.resolve_token().is_none() {
            tracing::warn!(
                "No API token configured - set {} before fetching",
                self.api.token_env
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  API:
    flavor: {:?}
    base_url: {}
    legacy_base_url: {}
    token: {}
    timeout: {}
  Retry:
    attempts: {}
    delay: {}ms
  Snapshot:
    enabled: {}
    path: {}
    ttl: {}s
  View:
    time_frame: {}
    sort: {} {}
    view_mode: {}
    winrate: {}
"#,
            self.api.flavor,
            mask_url(&self.api.base_url),
            mask_url(&self.api.legacy_base_url),
            if self.api.resolve_token().is_some() {
                "***"
            } else {
                "(not set)"
            },
            self.api
                .timeout_ms
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_else(|| "transport default".to_string()),
            self.retry.attempts,
            self.retry.delay_ms,
            self.snapshot.enabled,
            self.snapshot.path,
            self.snapshot.ttl_secs,
            self.view.time_frame,
            self.view.sort_method,
            self.view.sort_direction,
            self.view.view_mode,
            self.view.winrate,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: default_base_url(),
                token: None,
                token_env: default_token_env(),
                flavor: default_flavor(),
                legacy_base_url: default_legacy_base_url(),
                timeout_ms: None,
            },
            retry: RetryConfig::default(),
            snapshot: SnapshotConfig::default(),
            view: ViewConfig::default(),
        }
    }
}
