//! HTTP page fetching with optional exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the session can run against the
//! network or an in-memory page set:
//! - [`FetchAsync`]: Core trait, one GET per call
//! - [`HttpFetcher`]: `reqwest` implementation with timeout and user agent
//! - [`RetryFetch`]: Decorator that retries transport failures
//!
//! # Retry Strategy
//!
//! - Retries only [`ScrapeError::Transport`] failures, never HTTP statuses
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added so concurrent sessions don't sync up

use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::error::ScrapeError;
use crate::models::{ArchiveTarget, Source};

/// A fetched page: where we asked, where we ended up, and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub requested_url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// How a month page fetch turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    NotFound,
    /// The month page redirected to the year index: the month doesn't exist.
    GranularityRedirect,
    Error(u16),
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Ok => write!(f, "ok"),
            PageStatus::NotFound => write!(f, "not found"),
            PageStatus::GranularityRedirect => {
                write!(f, "redirected to year index (month-level archive not supported)")
            }
            PageStatus::Error(code) => write!(f, "http status {code}"),
        }
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Classify a fetched month page against the target that was requested.
///
/// A redirect to the year index wins over any status code.
pub fn classify(source: &Source, target: &ArchiveTarget, page: &FetchedPage) -> PageStatus {
    use chrono::Datelike;

    if same_url(&page.final_url, &source.year_url(target.date.year())) {
        return PageStatus::GranularityRedirect;
    }
    match page.status {
        200..=299 => PageStatus::Ok,
        404 => PageStatus::NotFound,
        code => PageStatus::Error(code),
    }
}

/// Trait for fetching a single URL.
///
/// Implementors perform exactly one logical GET per call, following
/// redirects, and report transport failures as [`ScrapeError::Transport`].
/// Non-2xx responses are not errors.
pub trait FetchAsync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError>;
}

impl<T: FetchAsync> FetchAsync for &T {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        (**self).fetch(url).await
    }
}

/// Network fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request timeout and user agent.
    ///
    /// Redirects are followed with the client's default policy.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl FetchAsync for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::transport(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::transport(url, e))?;

        debug!(
            status,
            %final_url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
/// With `max_retries == 0` the wrapper is a pass-through.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %e,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
