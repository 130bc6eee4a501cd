//! # Awful Archive Scraper
//!
//! Scrapes post metadata from the month archive pages of a list of
//! publications and writes it out as a flat CSV dataset for the dashboards.
//!
//! ## Features
//!
//! - Probes each publication for an archive before scraping it
//! - Walks archive month pages back from the current month (`--rollback`)
//! - Extracts author, date, reading time, URL, title, preview image and claps
//!   with a swappable markup strategy
//! - Isolates failing publications with `--suppress-errors`
//! - Writes a CSV dataset and, optionally, a JSON snapshot
//!
//! ## Usage
//!
//! ```sh
//! awful_archive_scraper -s authors.txt -r 1 -o ./data
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Probing**: Check each publication's `/archive` page
//! 2. **Locating**: Build the month page URLs to visit
//! 3. **Fetching**: Download month pages one at a time per publication
//! 4. **Extracting**: Parse post cards and normalize their fields
//! 5. **Output**: Write the CSV dataset and optional JSON snapshot

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod batch;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod normalize;
mod outputs;
mod probe;
mod scrapers;
mod session;
mod utils;

use cli::Cli;
use config::ScrapeConfig;
use fetch::{HttpFetcher, RetryFetch};
use outputs::json::{Snapshot, write_snapshot};
use utils::{ensure_writable_dir, load_sources};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive scraper starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = ScrapeConfig::resolve(&args)?;
    info!(
        rollback = config.rollback_months,
        step = ?config.step,
        suppress = config.suppress_errors,
        strategy = %config.strategy,
        "Resolved configuration"
    );

    // Early check: fail before any network traffic if we can't write the result
    if let Err(e) = ensure_writable_dir(&args.dataset_dir).await {
        error!(
            path = %args.dataset_dir,
            error = %e,
            "Dataset directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let sources = load_sources(&args.sources).await?;

    // ---- Scrape ----
    let strategy = scrapers::strategy_by_name(&config.strategy)?;
    let http = HttpFetcher::new(config.request_timeout(), &config.user_agent)?;
    let fetcher = RetryFetch::new(http, config.max_retries, config.retry_base_delay());

    let dataset = batch::scrape_all(&sources, &fetcher, strategy.as_ref(), &config).await?;
    for removed in &dataset.removed {
        info!(source = %removed.url, reason = %removed.reason, "Source not in dataset");
    }

    // ---- CSV output ----
    let dataset_path = args.dataset_path();
    let rows = outputs::csv::write_dataset_file(&dataset, &dataset_path)?;
    info!(path = %dataset_path, rows, "Dataset written");

    // ---- JSON output ----
    if let Some(json_dir) = &args.json_output_dir {
        let snapshot = Snapshot::now(&dataset);
        if let Err(e) = write_snapshot(&snapshot, json_dir).await {
            error!(error = %e, "Failed to write JSON snapshot");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        sources = dataset.sources.len(),
        removed = dataset.removed.len(),
        posts = rows,
        "Execution complete"
    );

    Ok(())
}
