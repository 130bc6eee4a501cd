//! Command-line interface definitions for the archive scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Scrape tuning flags are optional and override the YAML config file when
//! given; see [`crate::config::ScrapeConfig`].

use clap::Parser;

use crate::archive::StepMode;

/// Command-line arguments for the archive scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape the last three archive months of every publication in authors.txt
/// awful_archive_scraper -s authors.txt -r 1 -o ./data
///
/// # Keep going when a publication has no archive or is unreachable
/// awful_archive_scraper -s authors.txt --suppress-errors
///
/// # Also dump the full dataset as JSON
/// awful_archive_scraper -s authors.txt -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// File with one publication root URL per line
    #[arg(short, long, default_value = "authors.txt")]
    pub sources: String,

    /// Output directory for the CSV dataset
    #[arg(short = 'o', long, visible_alias = "output", env = "DATASET_PATH", default_value = ".")]
    pub dataset_dir: String,

    /// File name of the CSV dataset inside the output directory
    #[arg(long, default_value = "raw_dataset.csv")]
    pub dataset_name: String,

    /// Optional output directory for a JSON dump of the dataset
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Months to roll back from the current month
    #[arg(short, long)]
    pub rollback: Option<u32>,

    /// Drop failing publications instead of aborting the run
    #[arg(long)]
    pub suppress_errors: bool,

    /// How archive months are stepped back
    #[arg(long, value_enum)]
    pub step: Option<StepMode>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Delay between archive page requests of one publication, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Publications scraped concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries for network failures
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Markup extraction strategy
    #[arg(long)]
    pub strategy: Option<String>,
}

impl Cli {
    /// Full path of the CSV dataset.
    pub fn dataset_path(&self) -> String {
        format!("{}/{}", self.dataset_dir.trim_end_matches('/'), self.dataset_name)
    }
}
