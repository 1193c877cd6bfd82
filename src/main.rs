//! smbc-harvest main entry point
//!
//! Command-line interface for the multi-source SMBC metadata scraper.

use anyhow::Context;
use clap::{Parser, Subcommand};
use smbc_harvest::config::{self, CliOverrides, Settings};
use smbc_harvest::export::save_records;
use smbc_harvest::fetch::HttpClient;
use smbc_harvest::record::Source;
use smbc_harvest::sources::local;
use smbc_harvest::sources::ohnorobot::OhNoRobotScraper;
use smbc_harvest::sources::smbc::SmbcScraper;
use smbc_harvest::sources::wiki::WikiScraper;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Scrape SMBC comic metadata from multiple sources
#[derive(Parser, Debug)]
#[command(name = "smbc-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Scrape SMBC comic metadata from multiple sources", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to save exported tabular files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory to save raw HTML and images
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for HTTP response caching
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Maximum requests per second
    #[arg(long, global = true)]
    max_rate: Option<f64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the main smbc-comics.com site by ID range
    Smbc {
        /// Start comic ID (e.g. 1)
        #[arg(long)]
        start_id: u32,

        /// End comic ID, inclusive (e.g. 7500)
        #[arg(long)]
        end_id: u32,
    },

    /// Search ohnorobot.com using queries mined from prior exports
    Ohnorobot {
        /// Number of exported records used to generate search queries
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Scrape transcripts from the smbc-wiki.com API by ID range
    Wiki {
        /// Start comic ID (e.g. 1)
        #[arg(long)]
        start_id: u32,

        /// End comic ID, inclusive (e.g. 7500)
        #[arg(long)]
        end_id: u32,
    },

    /// Ingest comic markdown files from a local archive checkout
    Local {
        /// Directory containing the markdown files
        #[arg(long)]
        input_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let settings = resolve_settings(&cli)?;
    config::validate(&settings)?;

    match cli.command {
        Command::Smbc { start_id, end_id } => {
            config::validate_id_range(start_id, end_id)?;
            let client = build_client(&settings)?;
            let scraper = SmbcScraper::new(client, &settings.data_dir);
            let records = scraper.scrape_id_range(start_id, end_id).await;
            save_records(&records, &settings.output_dir, Source::Smbc.as_str())?;
        }
        Command::Ohnorobot { limit } => {
            let client = build_client(&settings)?;
            let scraper = OhNoRobotScraper::new(client);
            let records = scraper.scrape(&settings.output_dir, limit).await;
            save_records(&records, &settings.output_dir, Source::OhNoRobot.as_str())?;
        }
        Command::Wiki { start_id, end_id } => {
            config::validate_id_range(start_id, end_id)?;
            let client = build_client(&settings)?;
            let scraper = WikiScraper::new(client);
            let records = scraper.scrape_id_range(start_id, end_id).await;
            save_records(&records, &settings.output_dir, Source::Wiki.as_str())?;
        }
        Command::Local { input_dir } => {
            let records = local::load_records(&input_dir);
            save_records(&records, &settings.output_dir, Source::LocalMd.as_str())?;
        }
    }

    tracing::info!("All tasks completed");
    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("smbc_harvest=info,warn"),
            1 => EnvFilter::new("smbc_harvest=debug,info"),
            2 => EnvFilter::new("smbc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Assembles settings from defaults, the optional TOML file, and CLI flags.
fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    let mut overrides = CliOverrides::default();

    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = dir.clone();
        overrides.cache_dir = true;
    }
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
        overrides.data_dir = true;
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
        overrides.output_dir = true;
    }
    if let Some(rate) = cli.max_rate {
        settings.max_rate = rate;
        overrides.max_rate = true;
    }

    if let Some(path) = &cli.config {
        let file = config::load_file_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        settings.merge_file(file, &overrides);
        tracing::info!("Loaded configuration from {}", path.display());
    }

    Ok(settings)
}

/// Builds the run's shared HTTP client.
fn build_client(settings: &Settings) -> anyhow::Result<Arc<HttpClient>> {
    Ok(Arc::new(HttpClient::new(
        &settings.cache_dir,
        settings.max_rate,
    )?))
}
