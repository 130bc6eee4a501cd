//! Field normalization for extracted posts.
//!
//! [`normalize`] is pure and total: it never fails, unset fields stay unset,
//! and applying it twice gives the same result as applying it once.

use crate::models::{PostRecord, RawPost};

/// Tracking query the archive appends to every post link.
const ARCHIVE_TRACKING_QUERY: &str = "?source=collection_archive";

/// Clean up a raw post into its canonical form.
pub fn normalize(raw: RawPost) -> PostRecord {
    PostRecord {
        author: clean(raw.author),
        date: clean(raw.date).and_then(|d| non_empty(date_only(&d).trim_end().to_string())),
        reading_time: clean(raw.reading_time).and_then(|r| non_empty(reading_minutes_text(&r))),
        post_url: clean(raw.post_url)
            .and_then(|u| non_empty(strip_tracking(&u).trim_end().to_string())),
        title: clean(raw.title),
        preview_image_url: clean(raw.preview_image_url),
        claps: clean(raw.claps),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| non_empty(v.split_whitespace().collect::<Vec<_>>().join(" ")))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// `"2023-05-01T12:00:00Z"` → `"2023-05-01"`.
pub fn date_only(datetime: &str) -> String {
    datetime.split('T').next().unwrap_or(datetime).to_string()
}

/// `"5 min read"` → `"5"`.
///
/// Keeps the leading numeric tokens. Text that doesn't start with a number is
/// returned unchanged.
pub fn reading_minutes_text(text: &str) -> String {
    let numeric: Vec<&str> = text
        .split_whitespace()
        .take_while(|token| token.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .collect();
    if numeric.is_empty() {
        text.to_string()
    } else {
        numeric.join(" ")
    }
}

/// Drop the archive tracking query from a post URL.
pub fn strip_tracking(url: &str) -> String {
    url.split(ARCHIVE_TRACKING_QUERY)
        .next()
        .unwrap_or(url)
        .to_string()
}
