//! Error types for the scraping pipeline.
//!
//! Only failures that can abort a source (or, in strict mode, the whole
//! batch) are errors. Page-level and post-level problems are absorbed where
//! they happen and show up as [`crate::fetch::PageStatus`] values or unset
//! fields instead.

use thiserror::Error;

/// Errors raised while scraping, configuring or exporting.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A source line could not be turned into a usable root URL.
    #[error("invalid source URL {url:?}: {reason}")]
    InvalidSource { url: String, reason: String },

    /// Network, DNS, TLS or timeout failure while talking to a source.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Bad configuration (unknown strategy, unreadable config file, ...).
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Build a [`ScrapeError::Transport`] from anything displayable.
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ScrapeError::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::Transport { .. })
    }
}
