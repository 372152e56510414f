//! lightkeeper CLI
//!
//! Local execution entry point over filesystem-backed stores.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lightkeeper::{
    audit::{run_audit, AuditClient},
    cleanup::{cutoff_from_days, run_cleanup},
    error::Result,
    models::{Config, QueryOptions},
    stats::StatsEngine,
    store::ReportStore,
};

/// lightkeeper - Lighthouse report store and score aggregator
#[derive(Parser, Debug)]
#[command(
    name = "lightkeeper",
    version,
    about = "Stores Lighthouse audit runs and serves median scores"
)]
struct Cli {
    /// Path to storage directory containing config.toml
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit a URL and store the result
    Audit {
        /// URL to audit
        url: String,

        /// Overwrite the most recent run instead of appending
        #[arg(long)]
        replace: bool,
    },

    /// Show stored runs for a URL
    Reports {
        /// URL to look up
        url: String,

        /// Maximum number of runs to fetch
        #[arg(long)]
        max: Option<usize>,

        /// Bypass the cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Show per-category median scores for a URL
    Scores {
        /// URL to aggregate
        url: String,
    },

    /// Show pooled median scores across all saved URLs
    Medians,

    /// List all saved URLs
    Urls,

    /// Purge URLs not viewed within the retention window
    Cleanup {
        /// Override the retention window in days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.storage.root = cli.storage_dir.clone();

    let store = ReportStore::open_local(&config);

    match cli.command {
        Command::Audit { url, replace } => {
            let client = AuditClient::new(&config.audit)?;
            let summary = run_audit(&client, &store, &url, replace).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Reports { url, max, no_cache } => {
            let opts = QueryOptions {
                max_results: max.unwrap_or(config.query.max_results),
                use_cache: !no_cache && config.query.use_cache,
            };
            let runs = store.get_reports(&url, opts).await?;
            log::info!("{} stored runs for {}", runs.len(), url);
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }

        Command::Scores { url } => {
            let engine = StatsEngine::new(store.clone());
            let medians = engine.median_scores(&url, config.query).await?;
            println!("{}", serde_json::to_string_pretty(&medians)?);
        }

        Command::Medians => {
            let engine = StatsEngine::new(store.clone());
            let medians = engine.median_scores_all_urls(config.query).await?;
            println!("{}", serde_json::to_string_pretty(&medians)?);
        }

        Command::Urls => {
            let urls = store.get_all_saved_urls(config.query.use_cache).await?;
            log::info!("{} saved URLs", urls.len());
            for url in urls {
                println!("{url}");
            }
        }

        Command::Cleanup { days } => {
            let days = days.unwrap_or(config.retention.max_age_days);
            let purged = run_cleanup(&store, cutoff_from_days(days)).await?;
            log::info!("Purged {} URLs older than {} days", purged, days);
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("All validations passed!");
        }
    }

    Ok(())
}
