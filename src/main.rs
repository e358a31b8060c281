//! Metagame - archetype matchup matrix from the command line

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::error;

use metagame_matrix::cli::commands::{self, FilterArgs, ViewArgs};
use metagame_matrix::config::Config;

/// Archetype matchup matrix with confidence intervals
#[derive(Parser)]
#[command(name = "metagame")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "metagame.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterFlags {
    /// 1_month, 3_months, 6_months, 1_year or all_time
    #[arg(short, long)]
    time_frame: Option<String>,

    /// Minimum share of matches (0-100); empty or invalid means no cutoff
    #[arg(short = 'p', long)]
    min_percentage: Option<String>,

    /// Custom range start (YYYY-MM-DD), needs --end-date
    #[arg(long)]
    start_date: Option<String>,

    /// Custom range end (YYYY-MM-DD), needs --start-date
    #[arg(long)]
    end_date: Option<String>,
}

impl From<FilterFlags> for FilterArgs {
    fn from(flags: FilterFlags) -> Self {
        FilterArgs {
            time_frame: flags.time_frame,
            min_percentage: flags.min_percentage,
            start_date: flags.start_date,
            end_date: flags.end_date,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the matchup matrix
    Show {
        #[command(flatten)]
        filter: FilterFlags,

        /// games, winrate or alpha
        #[arg(short, long)]
        sort: Option<String>,

        /// asc or desc
        #[arg(short, long)]
        direction: Option<String>,

        /// Only show these archetypes as rows (repeatable)
        #[arg(long = "only")]
        only: Vec<String>,

        /// filtered_vs_all or filtered_vs_filtered
        #[arg(long)]
        view_mode: Option<String>,

        /// total or filtered
        #[arg(long)]
        winrate: Option<String>,

        /// Print the projection as JSON
        #[arg(long)]
        json: bool,
    },

    /// List overall records per archetype
    Records {
        #[command(flatten)]
        filter: FilterFlags,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check token, API and snapshot
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    let directive = match "metagame_matrix=info".parse() {
        Ok(directive) => directive,
        Err(e) => anyhow::bail!("Invalid log directive: {}", e),
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Show {
            filter,
            sort,
            direction,
            only,
            view_mode,
            winrate,
            json,
        } => {
            let view = ViewArgs {
                sort,
                direction,
                only,
                view_mode,
                winrate,
                json,
            };
            commands::show(&config, &filter.into(), &view).await
        }
        Commands::Records { filter } => commands::records(&config, &filter.into()).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
