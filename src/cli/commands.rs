//! CLI command implementations

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::api::{build_client, MatchupApi};
use crate::cache::SnapshotStore;
use crate::config::{ApiFlavor, Config};
use crate::filter::{parse_min_percentage, FilterState, TimeFrame};
use crate::render::{render_matrix, render_records};
use crate::stats::WinrateOption;
use crate::view::{Dashboard, MatrixViewMode, SortDirection, SortMethod, ViewState};

/// Filter flags shared by `show` and `records`
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub time_frame: Option<String>,
    pub min_percentage: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterArgs {
    pub fn to_filter_state(&self, default_time_frame: TimeFrame) -> Result<FilterState> {
        let time_frame = match &self.time_frame {
            Some(tf) => tf.parse::<TimeFrame>()?,
            None => default_time_frame,
        };

        let mut filter = FilterState::new(time_frame);

        if let Some(input) = &self.min_percentage {
            let percentage = parse_min_percentage(input);
            if percentage.is_none() && !input.trim().is_empty() {
                warn!("Ignoring minimum percentage {:?}", input);
            }
            filter.set_min_percentage(percentage);
        }

        filter.set_date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        if filter.custom_range().is_none()
            && (filter.start_date.is_some() || filter.end_date.is_some())
        {
            warn!("Date range needs both --start-date and --end-date; using the time frame");
        }

        Ok(filter)
    }
}

/// Presentation flags for `show`
#[derive(Debug, Clone, Default)]
pub struct ViewArgs {
    pub sort: Option<String>,
    pub direction: Option<String>,
    /// Restrict rows to these archetypes
    pub only: Vec<String>,
    pub view_mode: Option<String>,
    pub winrate: Option<String>,
    pub json: bool,
}

async fn open_dashboard(config: &Config, filter: &FilterArgs) -> Result<Dashboard> {
    let api = build_client(config)?;
    let mut state = ViewState::from_config(&config.view);
    state.filter = filter.to_filter_state(config.view.time_frame)?;

    let mut dashboard = Dashboard::new(api, state, SnapshotStore::from_config(&config.snapshot));
    dashboard
        .initialize()
        .await
        .context("Failed to load matchup data")?;
    Ok(dashboard)
}

/// Render the matchup matrix
pub async fn show(config: &Config, filter: &FilterArgs, args: &ViewArgs) -> Result<()> {
    let mut dashboard = open_dashboard(config, filter).await?;

    if args.sort.is_some() || args.direction.is_some() {
        let current = dashboard.state().sort();
        let method = match &args.sort {
            Some(method) => method.parse::<SortMethod>()?,
            None => current.method,
        };
        let direction = match &args.direction {
            Some(direction) => direction.parse::<SortDirection>()?,
            None => SortDirection::Desc,
        };
        dashboard.sort_by(method, direction);
    }

    if let Some(mode) = &args.view_mode {
        dashboard.set_view_mode(mode.parse::<MatrixViewMode>()?);
    }

    if let Some(option) = &args.winrate {
        dashboard.set_winrate_option(option.parse::<WinrateOption>()?);
    }

    if !args.only.is_empty() {
        for name in &args.only {
            if !dashboard.state().archetypes().contains(name) {
                warn!(archetype = %name, "Unknown archetype, skipping");
            }
        }
        dashboard.set_visible_set(args.only.as_slice());
    }

    let view = dashboard
        .matrix_view()
        .ok_or_else(|| anyhow!("No matchup data available"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_matrix(&view));
    }

    Ok(())
}

/// List per-archetype totals in games order
pub async fn records(config: &Config, filter: &FilterArgs) -> Result<()> {
    let dashboard = open_dashboard(config, filter).await?;
    let entry = dashboard
        .displayed()
        .ok_or_else(|| anyhow!("No matchup data available"))?;

    let rows: Vec<_> = entry
        .archetypes
        .iter()
        .map(|name| (name.clone(), entry.total_aggregate(name)))
        .collect();

    println!("\n=== {} ({} archetypes) ===\n", entry.key, rows.len());
    print!("{}", render_records(&rows));

    let stats = dashboard.cache().stats();
    info!(hit_rate = stats.hit_rate(), "Cache stats");

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check token, API reachability and the stored snapshot
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== HEALTH CHECK ===\n");

    let mut all_healthy = true;

    if config.api.flavor == ApiFlavor::Authenticated {
        print!("API token... ");
        if config.api.resolve_token().is_some() {
            println!("OK");
        } else {
            println!("MISSING (set {})", config.api.token_env);
            all_healthy = false;
        }
    } else {
        println!("API token... SKIPPED (legacy API)");
    }

    let api = build_client(config)?;
    print!("Matchup API ({})... ", api.name());
    match check_api(api).await {
        Ok((archetypes, latency)) => println!("OK ({} archetypes, {}ms)", archetypes, latency),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Snapshot... ");
    match SnapshotStore::from_config(&config.snapshot) {
        Some(store) => match store.load_fresh().await {
            Ok(Some(entry)) => println!("FRESH ({} archetypes)", entry.archetypes.len()),
            Ok(None) => println!("NONE ({})", store.path().display()),
            Err(e) => println!("UNREADABLE: {}", e),
        },
        None => println!("DISABLED"),
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}

async fn check_api(api: Arc<dyn MatchupApi>) -> Result<(usize, u64)> {
    let start = Instant::now();
    let payload = api.fetch_matrix(&FilterState::default()).await?;
    Ok((payload.archetypes.len(), start.elapsed().as_millis() as u64))
}
