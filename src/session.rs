//! One publication's end-to-end scrape.
//!
//! A session walks a fixed sequence of states:
//!
//! ```text
//! Init -> Probed -> Unavailable
//!                -> TargetsBuilt -> Fetching -> Done
//! ```
//!
//! Pages are fetched one at a time, newest first, each one preceded by the
//! configured request delay. A month URL is fetched at most once even when
//! two targets resolve to it. A month page that redirects to its year index
//! is skipped, as is anything that parses to zero posts; neither ends the
//! session. Transport errors do, and are
//! returned to the coordinator.

use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::archive::build_archive_targets_from;
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::fetch::{FetchAsync, PageStatus, classify};
use crate::models::{ArchiveTarget, SkippedPage, Source, SourceArchive};
use crate::normalize::normalize;
use crate::probe::is_archive_available;
use crate::scrapers::ExtractionStrategy;
use crate::utils::truncate_for_log;

/// Reason recorded when two targets land on the same month page.
pub const DUPLICATE_MONTH: &str = "duplicate month";

/// Reason reported for sources without an archive.
pub const PROFILE_UNSUPPORTED: &str =
    "scraping from the profile page (without archive) is not supported";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Probed,
    Unavailable,
    TargetsBuilt,
    Fetching,
    Done,
}

/// What a finished session produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(SourceArchive),
    /// The source can't be scraped this way; nothing was attempted past the probe.
    Unsupported { source: Source, reason: String },
}

/// Scrape state for a single source.
///
/// The [`SourceArchive`] accumulator lives only inside [`PublicationSession::run`]
/// and is handed back in the outcome.
#[derive(Debug)]
pub struct PublicationSession<'a, F> {
    source: Source,
    fetcher: &'a F,
    strategy: &'a dyn ExtractionStrategy,
    config: &'a ScrapeConfig,
    today: NaiveDate,
    state: SessionState,
}

impl<'a, F: FetchAsync> PublicationSession<'a, F> {
    /// Set up a session for a raw source line.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::InvalidSource`] if the line is not a usable URL.
    pub fn new(
        raw_url: &str,
        fetcher: &'a F,
        strategy: &'a dyn ExtractionStrategy,
        config: &'a ScrapeConfig,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            source: Source::parse(raw_url)?,
            fetcher,
            strategy,
            config,
            today: Local::now().date_naive(),
            state: SessionState::Init,
        })
    }

    /// Pin "today" for archive target computation.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, source = %self.source.root_url, "Session transition");
        self.state = next;
    }

    /// Probe, enumerate and scrape every archive target.
    #[instrument(level = "info", skip_all, fields(source = %self.source.root_url))]
    pub async fn run(&mut self) -> Result<SessionOutcome, ScrapeError> {
        let available = is_archive_available(self.fetcher, &self.source).await?;
        self.transition(SessionState::Probed);

        if !available {
            self.transition(SessionState::Unavailable);
            warn!("Archive not available; skipping source");
            return Ok(SessionOutcome::Unsupported {
                source: self.source.clone(),
                reason: PROFILE_UNSUPPORTED.to_string(),
            });
        }

        let targets = build_archive_targets_from(
            &self.source,
            self.config.rollback_months,
            self.config.step,
            self.today,
        );
        self.transition(SessionState::TargetsBuilt);

        self.transition(SessionState::Fetching);
        let mut archive = SourceArchive::new(self.source.clone());
        let mut visited: HashSet<&str> = HashSet::new();
        for target in &targets {
            if !visited.insert(target.url.as_str()) {
                debug!(url = %target.url, date = %target.date, "Month page already scraped");
                archive.pages_skipped.push(SkippedPage {
                    url: target.url.clone(),
                    reason: DUPLICATE_MONTH.to_string(),
                });
                continue;
            }
            // The probe is the first request, so every page fetch waits.
            let delay = self.config.request_delay();
            if !delay.is_zero() {
                sleep(delay).await;
            }
            self.scrape_target(target, &mut archive).await?;
        }
        self.transition(SessionState::Done);

        info!(
            pages = archive.pages_fetched,
            skipped = archive.pages_skipped.len(),
            posts = archive.post_count(),
            claps = archive.total_claps(),
            reading_minutes = archive.total_reading_minutes(),
            latest = ?archive.latest_post_date(),
            "Scraped source"
        );
        Ok(SessionOutcome::Completed(archive))
    }

    /// Fetch one month page and fold its posts into `archive`.
    #[instrument(level = "debug", skip(self, archive), fields(url = %target.url))]
    async fn scrape_target(
        &self,
        target: &ArchiveTarget,
        archive: &mut SourceArchive,
    ) -> Result<PageStatus, ScrapeError> {
        let page = self.fetcher.fetch(&target.url).await?;
        let status = classify(&self.source, target, &page);

        if status == PageStatus::GranularityRedirect {
            warn!(
                requested = %page.requested_url,
                final_url = %page.final_url,
                "Skipping page: {status}"
            );
            archive.pages_skipped.push(SkippedPage {
                url: target.url.clone(),
                reason: status.to_string(),
            });
            return Ok(status);
        }
        if status != PageStatus::Ok {
            warn!(%status, "Archive page did not load cleanly; parsing anyway");
        }

        let posts: Vec<_> = self
            .strategy
            .extract_from_html(&page.body)
            .into_iter()
            .map(normalize)
            .collect();
        archive.pages_fetched += 1;

        if posts.is_empty() {
            debug!(
                preview = %truncate_for_log(&page.body, 200),
                "Page produced no posts"
            );
        } else {
            info!(count = posts.len(), date = %target.date, "Extracted posts");
        }
        archive.posts.entry(target.date).or_default().extend(posts);
        Ok(status)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetch::FetchedPage;
    use crate::scrapers::stream::StreamItemStrategy;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory site: known URLs answer with canned pages, unknown URLs 404.
    #[derive(Debug, Default)]
    pub(crate) struct FakeSite {
        pages: HashMap<String, Result<FetchedPage, String>>,
        pub(crate) requests: RefCell<Vec<String>>,
    }

    impl FakeSite {
        pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                Ok(FetchedPage {
                    requested_url: url.into(),
                    final_url: url.into(),
                    status: 200,
                    body: body.into(),
                }),
            );
            self
        }

        pub(crate) fn redirect(mut self, url: &str, to: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                Ok(FetchedPage {
                    requested_url: url.into(),
                    final_url: to.into(),
                    status: 200,
                    body: String::new(),
                }),
            );
            self
        }

        pub(crate) fn broken(mut self, url: &str) -> Self {
            self.pages.insert(url.to_string(), Err("connection refused".into()));
            self
        }
    }

    impl FetchAsync for FakeSite {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
            self.requests.borrow_mut().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(message)) => Err(ScrapeError::transport(url, message)),
                None => Ok(FetchedPage {
                    requested_url: url.into(),
                    final_url: url.into(),
                    status: 404,
                    body: "<html>not here</html>".into(),
                }),
            }
        }
    }

    pub(crate) fn post_card(title: &str) -> String {
        format!(
            r#"<div class="streamItem--postPreview">
  <div class="postMetaInline-authorLockup"><a href="/@w">Writer</a>
    <div class="ui-caption"><time datetime="2024-01-10T08:00:00Z"></time>
      <span class="readingTime" title="6 min read"></span></div></div>
  <a href="https://pub.example/{title}?source=collection_archive---0">
    <div class="postArticle-content"><h3>{title}</h3></div></a>
</div>"#
        )
    }

    pub(crate) fn quiet_config() -> ScrapeConfig {
        ScrapeConfig {
            request_delay_ms: 0,
            ..Default::default()
        }
    }

    pub(crate) fn mid_march() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn test_full_session() {
        // rollback 1 from 2024-03-15: 2024/01 (twice) and 2023/12
        let site = FakeSite::default()
            .page("https://pub.example/archive", "<html>archive</html>")
            .page(
                "https://pub.example/archive/2024/01",
                &format!("<html>{}{}</html>", post_card("a"), post_card("b")),
            )
            .redirect(
                "https://pub.example/archive/2023/12",
                "https://pub.example/archive/2023",
            );
        let config = quiet_config();
        let mut session =
            PublicationSession::new("https://pub.example/", &site, &StreamItemStrategy, &config)
                .unwrap()
                .with_today(mid_march());

        let outcome = session.run().await.unwrap();
        assert_eq!(session.state(), SessionState::Done);

        let SessionOutcome::Completed(archive) = outcome else {
            panic!("expected a completed session");
        };
        assert_eq!(archive.pages_fetched, 1);
        assert_eq!(archive.pages_skipped.len(), 2);
        assert_eq!(archive.pages_skipped[0].url, "https://pub.example/archive/2024/01");
        assert_eq!(archive.pages_skipped[0].reason, DUPLICATE_MONTH);
        assert_eq!(archive.pages_skipped[1].url, "https://pub.example/archive/2023/12");
        assert_eq!(archive.posts.len(), 1);
        assert_eq!(archive.post_count(), 2);

        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let post = &archive.posts[&jan31][0];
        assert_eq!(post.date.as_deref(), Some("2024-01-10"));
        assert_eq!(post.reading_time.as_deref(), Some("6"));
        assert_eq!(post.post_url.as_deref(), Some("https://pub.example/a"));

        let requests = site.requests.borrow();
        assert_eq!(requests[0], "https://pub.example/archive");
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_shared_month_page_is_fetched_once() {
        // 2024-01-31 and 2024-01-01 both resolve to /2024/01
        let site = FakeSite::default()
            .page("https://pub.example/archive", "ok")
            .page(
                "https://pub.example/archive/2024/01",
                &format!("<html>{}</html>", post_card("a")),
            );
        let config = quiet_config();
        let mut session =
            PublicationSession::new("https://pub.example", &site, &StreamItemStrategy, &config)
                .unwrap()
                .with_today(mid_march());

        let SessionOutcome::Completed(archive) = session.run().await.unwrap() else {
            panic!("expected a completed session");
        };

        let january_fetches = site
            .requests
            .borrow()
            .iter()
            .filter(|u| u.ends_with("/2024/01"))
            .count();
        assert_eq!(january_fetches, 1);

        let dataset = crate::models::Dataset {
            sources: vec![archive],
            removed: Vec::new(),
        };
        let rows_for_a = dataset
            .rows()
            .iter()
            .filter(|row| row.post_url.as_deref() == Some("https://pub.example/a"))
            .count();
        assert_eq!(rows_for_a, 1);
    }

    #[tokio::test]
    async fn test_delay_precedes_every_page_fetch() {
        let site = FakeSite::default().page("https://pub.example/archive", "ok");
        let config = ScrapeConfig {
            request_delay_ms: 20,
            ..Default::default()
        };
        let mut session =
            PublicationSession::new("https://pub.example", &site, &StreamItemStrategy, &config)
                .unwrap()
                .with_today(mid_march());

        let started = std::time::Instant::now();
        session.run().await.unwrap();

        // probe + two distinct month pages; the duplicate is not paced
        assert_eq!(site.requests.borrow().len(), 3);
        assert!(started.elapsed() >= std::time::Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_unavailable_archive_is_unsupported() {
        let site = FakeSite::default().page(
            "https://pub.example/archive",
            "<h1>PAGE NOT FOUND</h1><p>404</p>",
        );
        let config = quiet_config();
        let mut session =
            PublicationSession::new("https://pub.example", &site, &StreamItemStrategy, &config)
                .unwrap();

        let outcome = session.run().await.unwrap();
        assert_eq!(session.state(), SessionState::Unavailable);
        assert!(matches!(outcome, SessionOutcome::Unsupported { .. }));
        assert_eq!(site.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_pages_complete_with_no_posts() {
        let site = FakeSite::default().page("https://pub.example/archive", "ok");
        let config = quiet_config();
        let mut session =
            PublicationSession::new("https://pub.example", &site, &StreamItemStrategy, &config)
                .unwrap()
                .with_today(mid_march());

        let SessionOutcome::Completed(archive) = session.run().await.unwrap() else {
            panic!("expected a completed session");
        };
        assert_eq!(archive.post_count(), 0);
        assert_eq!(archive.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_transport_error_on_page_fails_session() {
        let site = FakeSite::default()
            .page("https://pub.example/archive", "ok")
            .broken("https://pub.example/archive/2023/12");
        let config = quiet_config();
        let mut session =
            PublicationSession::new("https://pub.example", &site, &StreamItemStrategy, &config)
                .unwrap()
                .with_today(mid_march());

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport { .. }));
        assert_eq!(session.state(), SessionState::Fetching);
    }

    #[test]
    fn test_invalid_source_fails_construction() {
        let site = FakeSite::default();
        let config = quiet_config();
        let err = PublicationSession::new("nope", &site, &StreamItemStrategy, &config).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSource { .. }));
    }
}
