//! Post extraction strategies for archive page markup.
//!
//! Archive markup is the part of the pipeline most likely to break: the
//! platform renames classes without notice. Each known markup version lives
//! in its own module behind [`ExtractionStrategy`], so swapping one in needs
//! no change to sessions or the batch coordinator.
//!
//! # Supported Markup
//!
//! | Name | Module | Containers | Notes |
//! |------|--------|------------|-------|
//! | `stream-item` | [`stream`] | `div.streamItem--postPreview` | Server-rendered archive stream |
//!
//! # Contract
//!
//! Strategies never fail. A missing element leaves the matching field unset;
//! a container with nothing extractable is dropped.

use scraper::Html;
use std::fmt;

use crate::error::ScrapeError;
use crate::models::RawPost;

pub mod stream;

/// Pulls raw posts out of a parsed archive page.
pub trait ExtractionStrategy: fmt::Debug + Send + Sync {
    /// Name used on the command line and in logs.
    fn name(&self) -> &'static str;

    /// Extract every post preview on the page, in document order.
    fn extract_posts(&self, document: &Html) -> Vec<RawPost>;

    /// Parse `html` and extract its posts.
    ///
    /// The parsed document is dropped before returning, so callers can hold
    /// the result across `.await` points.
    fn extract_from_html(&self, html: &str) -> Vec<RawPost> {
        let document = Html::parse_document(html);
        self.extract_posts(&document)
    }
}

/// Names accepted by [`strategy_by_name`].
pub const STRATEGY_NAMES: &[&str] = &[stream::NAME];

/// Look up an extraction strategy by name.
pub fn strategy_by_name(name: &str) -> Result<Box<dyn ExtractionStrategy>, ScrapeError> {
    match name {
        stream::NAME => Ok(Box::new(stream::StreamItemStrategy)),
        other => Err(ScrapeError::Config(format!(
            "unknown extraction strategy {other:?} (known: {})",
            STRATEGY_NAMES.join(", ")
        ))),
    }
}
