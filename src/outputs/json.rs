//! JSON snapshot of the scraped dataset.
//!
//! Unlike the CSV table, the snapshot keeps the per-source structure: posts
//! bucketed by archive date, the pages that were skipped, and the sources
//! that were removed from the batch.
//!
//! # Output Structure
//!
//! Files are organized by date with time-of-day names, so several runs per
//! day don't overwrite each other:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::ScrapeError;
use crate::models::Dataset;
use crate::utils::time_of_day;

/// A dataset stamped with when it was produced.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// "morning", "afternoon", or "evening".
    pub time_of_day: String,
    pub local_time: String,
    pub dataset: &'a Dataset,
}

impl<'a> Snapshot<'a> {
    pub fn now(dataset: &'a Dataset) -> Self {
        let now = Local::now();
        Self {
            local_date: now.date_naive().to_string(),
            time_of_day: time_of_day(),
            local_time: now.time().to_string(),
            dataset,
        }
    }

    /// `{json_output_dir}/{date}/{time_of_day}.json`
    pub fn path_in(&self, json_output_dir: &str) -> PathBuf {
        PathBuf::from(json_output_dir)
            .join(&self.local_date)
            .join(format!("{}.json", self.time_of_day))
    }
}

/// Write a [`Snapshot`] with date-based directory structure.
///
/// # Returns
///
/// The path written, or an error if directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_snapshot(
    snapshot: &Snapshot<'_>,
    json_output_dir: &str,
) -> Result<PathBuf, ScrapeError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let path = snapshot.path_in(json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON snapshot");
    Ok(path)
}
