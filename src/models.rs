//! Data models for sources, archive targets, posts and the scraped dataset.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A publication root URL and its derived archive URLs
//! - [`ArchiveTarget`]: One month page of a source's archive to fetch
//! - [`PostRecord`]: Metadata for one post, every field optional
//! - [`SourceArchive`]: Everything scraped for one source, bucketed by date
//! - [`Dataset`]: The batch result, plus the sources that were removed
//! - [`DatasetRow`]: The flat CSV row consumed by the dashboards

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::error::ScrapeError;

/// A publication (or author profile) identified by its root URL.
///
/// The root is stored without a trailing slash so that the archive URLs
/// derived from it are stable regardless of how the source line was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// The root URL as used in the dataset's `author_url` column.
    pub root_url: String,
    /// `root_url + "/archive"`.
    pub archive_url: String,
}

impl Source {
    /// Parse and validate a source line.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidSource`] when the line is not an absolute
    /// `http`/`https` URL with a host.
    pub fn parse(raw: &str) -> Result<Self, ScrapeError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ScrapeError::InvalidSource {
            url: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        let root_url = trimmed.trim_end_matches('/').to_string();
        let archive_url = format!("{root_url}/archive");
        Ok(Self {
            root_url,
            archive_url,
        })
    }

    /// The year-granularity archive page, e.g. `<root>/archive/2024`.
    pub fn year_url(&self, year: i32) -> String {
        format!("{}/{}", self.archive_url, year)
    }

    /// The month-granularity archive page, e.g. `<root>/archive/2024/02`.
    pub fn month_url(&self, year: i32, month: u32) -> String {
        format!("{}/{}/{:02}", self.archive_url, year, month)
    }
}

/// One archive month page to visit for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveTarget {
    /// The date the page was derived from; also the bucket key for its posts.
    pub date: NaiveDate,
    /// The month page URL.
    pub url: String,
}

/// Metadata for one post.
///
/// Every field is independently optional: a post missing its clap count still
/// carries its title and URL. The same shape is used before and after
/// [`crate::normalize::normalize`], which keeps normalization idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub author: Option<String>,
    /// Publication date, `YYYY-MM-DD` once normalized.
    pub date: Option<String>,
    /// Reading time in minutes, `"5"` once normalized.
    pub reading_time: Option<String>,
    /// Canonical post URL, tracking query stripped once normalized.
    pub post_url: Option<String>,
    pub title: Option<String>,
    pub preview_image_url: Option<String>,
    /// Clap count as the platform formats it, e.g. `"1.2K"`.
    pub claps: Option<String>,
}

/// A post exactly as pulled off an archive page, before normalization.
pub type RawPost = PostRecord;

static CLAPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([KkMm])?$").expect("claps regex is valid"));

impl PostRecord {
    /// True when not a single field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.date.is_none()
            && self.reading_time.is_none()
            && self.post_url.is_none()
            && self.title.is_none()
            && self.preview_image_url.is_none()
            && self.claps.is_none()
    }

    /// The publication date as a calendar date, if it parses.
    pub fn published_on(&self) -> Option<NaiveDate> {
        let date = self.date.as_deref()?;
        let date = date.split('T').next().unwrap_or(date);
        NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
    }

    /// Reading time as whole minutes, if it starts with a number.
    pub fn reading_minutes(&self) -> Option<u32> {
        self.reading_time
            .as_deref()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    }

    /// Clap count as an integer, understanding `K`/`M` suffixes (`"1.2K"` → 1200).
    pub fn clap_count(&self) -> Option<u64> {
        let raw = self.claps.as_deref()?.trim().replace(',', "");
        let caps = CLAPS_RE.captures(&raw)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let multiplier = match caps.get(2).map(|m| m.as_str()) {
            Some("K") | Some("k") => 1_000.0,
            Some("M") | Some("m") => 1_000_000.0,
            _ => 1.0,
        };
        Some((value * multiplier).round() as u64)
    }
}

/// An archive page that was visited but contributed no posts on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub url: String,
    pub reason: String,
}

/// Everything scraped for a single source.
///
/// Posts are bucketed under the date of the archive target they were found
/// on, mirroring how the pages were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceArchive {
    pub source: Source,
    pub posts: BTreeMap<NaiveDate, Vec<PostRecord>>,
    /// Number of archive month pages that were fetched and parsed.
    pub pages_fetched: usize,
    pub pages_skipped: Vec<SkippedPage>,
}

impl SourceArchive {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            posts: BTreeMap::new(),
            pages_fetched: 0,
            pages_skipped: Vec::new(),
        }
    }

    /// Total posts across all date buckets.
    pub fn post_count(&self) -> usize {
        self.posts.values().map(Vec::len).sum()
    }

    fn all_posts(&self) -> impl Iterator<Item = &PostRecord> {
        self.posts.values().flatten()
    }

    /// Sum of clap counts over posts whose count parses.
    pub fn total_claps(&self) -> u64 {
        self.all_posts().filter_map(PostRecord::clap_count).sum()
    }

    /// Sum of reading minutes over posts whose reading time parses.
    pub fn total_reading_minutes(&self) -> u64 {
        self.all_posts()
            .filter_map(PostRecord::reading_minutes)
            .map(u64::from)
            .sum()
    }

    /// Most recent publication date among the scraped posts.
    pub fn latest_post_date(&self) -> Option<NaiveDate> {
        self.all_posts().filter_map(PostRecord::published_on).max()
    }
}

/// A source dropped from the batch, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedSource {
    pub url: String,
    pub reason: String,
}

/// The result of a batch: one [`SourceArchive`] per surviving source, in
/// input order, plus the sources that were removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub sources: Vec<SourceArchive>,
    pub removed: Vec<RemovedSource>,
}

impl Dataset {
    pub fn post_count(&self) -> usize {
        self.sources.iter().map(SourceArchive::post_count).sum()
    }

    /// Flatten into CSV rows: sources in input order, newest bucket first,
    /// posts in page order.
    pub fn rows(&self) -> Vec<DatasetRow> {
        self.sources
            .iter()
            .flat_map(|archive| {
                archive.posts.iter().rev().flat_map(move |(_, posts)| {
                    posts
                        .iter()
                        .map(move |post| DatasetRow::new(&archive.source, post))
                })
            })
            .collect()
    }
}

/// One row of the exported dataset.
///
/// The field order is the column order downstream consumers expect:
/// `author_url, author, date, reading_time, post_url, title, preview_image_url, claps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub author_url: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub reading_time: Option<String>,
    pub post_url: Option<String>,
    pub title: Option<String>,
    pub preview_image_url: Option<String>,
    pub claps: Option<String>,
}

impl DatasetRow {
    pub fn new(source: &Source, post: &PostRecord) -> Self {
        Self {
            author_url: source.root_url.clone(),
            author: post.author.clone(),
            date: post.date.clone(),
            reading_time: post.reading_time.clone(),
            post_url: post.post_url.clone(),
            title: post.title.clone(),
            preview_image_url: post.preview_image_url.clone(),
            claps: post.claps.clone(),
        }
    }
}
