//! Archive target enumeration.
//!
//! Given a source and a rollback window, produce the ordered list of month
//! pages to fetch, newest first. The anchor is the first day of the current
//! month; each step moves further into the past.
//!
//! # Step modes
//!
//! | Mode | Offset for step `m` | Notes |
//! |------|---------------------|-------|
//! | [`StepMode::ThirtyDays`] | `30 * m` days | Legacy behavior, default. Drifts on 31-day months. |
//! | [`StepMode::CalendarMonths`] | `m` calendar months | Exact month stepping. |

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::models::{ArchiveTarget, Source};

/// How far each archive step moves back from the anchor date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Subtract fixed multiples of 30 days.
    #[default]
    ThirtyDays,
    /// Subtract whole calendar months.
    CalendarMonths,
}

/// Number of targets produced for a rollback of `rollback` months.
pub fn target_count(rollback: u32) -> u32 {
    rollback + 2
}

/// Build the archive targets for `source` as seen from `today`.
///
/// Returns `rollback + 2` targets in strictly decreasing date order.
#[instrument(level = "debug", skip(source), fields(source = %source.root_url))]
pub fn build_archive_targets_from(
    source: &Source,
    rollback: u32,
    step: StepMode,
    today: NaiveDate,
) -> Vec<ArchiveTarget> {
    let anchor = today.with_day(1).unwrap_or(today);

    let targets: Vec<ArchiveTarget> = (1..=target_count(rollback))
        .filter_map(|m| {
            let date = match step {
                StepMode::ThirtyDays => anchor.checked_sub_signed(Duration::days(30 * i64::from(m))),
                StepMode::CalendarMonths => anchor.checked_sub_months(Months::new(m)),
            }?;
            Some(ArchiveTarget {
                date,
                url: source.month_url(date.year(), date.month()),
            })
        })
        .collect();

    debug!(count = targets.len(), ?step, "Built archive targets");
    targets
}
