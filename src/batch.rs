//! Batch coordination across sources.
//!
//! Runs one [`PublicationSession`] per source and merges the results into a
//! [`Dataset`]. The coordinator is the only place that decides whether a
//! source failure is contained or ends the run:
//!
//! | Failure | `suppress_errors = true` | `suppress_errors = false` |
//! |---------|--------------------------|---------------------------|
//! | Invalid source line | source removed | batch aborted |
//! | Transport error | source removed | batch aborted |
//! | No archive (unsupported) | source removed | source removed |
//!
//! Sources are processed `max_concurrent_sources` at a time (one by default).
//! Results keep input order either way.

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::fetch::FetchAsync;
use crate::models::{Dataset, RemovedSource};
use crate::scrapers::ExtractionStrategy;
use crate::session::{PublicationSession, SessionOutcome};

/// Scrape every source, anchored on today's local date.
pub async fn scrape_all<F: FetchAsync>(
    sources: &[String],
    fetcher: &F,
    strategy: &dyn ExtractionStrategy,
    config: &ScrapeConfig,
) -> Result<Dataset, ScrapeError> {
    scrape_all_from(sources, fetcher, strategy, config, Local::now().date_naive()).await
}

/// Scrape every source as seen from `today`.
///
/// # Errors
///
/// Only in strict mode: the first session construction or run failure.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), suppress = config.suppress_errors))]
pub async fn scrape_all_from<F: FetchAsync>(
    sources: &[String],
    fetcher: &F,
    strategy: &dyn ExtractionStrategy,
    config: &ScrapeConfig,
    today: NaiveDate,
) -> Result<Dataset, ScrapeError> {
    let t0 = Instant::now();

    // Work on a cleaned copy; the caller's list is never touched.
    let active: Vec<&str> = sources
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unique_by(|s| s.trim_end_matches('/').to_string())
        .collect();
    info!(
        active = active.len(),
        concurrency = config.max_concurrent_sources,
        strategy = strategy.name(),
        "Starting batch"
    );

    let mut results = stream::iter(active)
        .map(move |url| async move {
            let result = match PublicationSession::new(url, fetcher, strategy, config) {
                Ok(session) => {
                    let mut session = session.with_today(today);
                    session.run().await
                }
                Err(e) => Err(e),
            };
            (url, result)
        })
        .buffered(config.max_concurrent_sources.max(1));

    let mut dataset = Dataset::default();
    while let Some((url, result)) = results.next().await {
        match result {
            Ok(SessionOutcome::Completed(archive)) => dataset.sources.push(archive),
            Ok(SessionOutcome::Unsupported { source, reason }) => {
                warn!(source = %source.root_url, %reason, "Removing source");
                dataset.removed.push(RemovedSource {
                    url: url.to_string(),
                    reason,
                });
            }
            Err(e) if config.suppress_errors => {
                warn!(source = url, error = %e, "Source failed; removing it from the batch");
                dataset.removed.push(RemovedSource {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                error!(source = url, error = %e, "Source failed; aborting batch");
                return Err(e);
            }
        }
    }

    info!(
        scraped = dataset.sources.len(),
        removed = dataset.removed.len(),
        posts = dataset.post_count(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Batch complete"
    );
    Ok(dataset)
}
