//! Archive availability probe.
//!
//! Sources without an archive render a branded "page not found" page at
//! `<root>/archive`. Both markers have to be present for the archive to be
//! considered missing.

use tracing::{info, instrument};

use crate::error::ScrapeError;
use crate::fetch::FetchAsync;
use crate::models::Source;

const NOT_FOUND_MARKER: &str = "PAGE NOT FOUND";
const STATUS_MARKER: &str = "404";

/// Whether a probe response body describes an existing archive.
pub fn archive_body_available(body: &str) -> bool {
    !(body.contains(NOT_FOUND_MARKER) && body.contains(STATUS_MARKER))
}

/// Fetch `<root>/archive` once and decide whether the source has an archive.
///
/// # Errors
///
/// Transport failures are returned as-is; there is no retry at this level
/// beyond whatever the fetcher itself does.
#[instrument(level = "info", skip_all, fields(source = %source.root_url))]
pub async fn is_archive_available<F: FetchAsync>(
    fetcher: &F,
    source: &Source,
) -> Result<bool, ScrapeError> {
    let page = fetcher.fetch(&source.archive_url).await?;
    let available = archive_body_available(&page.body);
    info!(available, status = page.status, "Probed archive");
    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedPage;

    #[test]
    fn test_both_markers_means_unavailable() {
        assert!(!archive_body_available(
            "<h1>PAGE NOT FOUND</h1><p>Error 404</p>"
        ));
    }

    #[test]
    fn test_single_marker_means_available() {
        assert!(archive_body_available("<p>404 claps on this post</p>"));
        assert!(archive_body_available("<h1>PAGE NOT FOUND</h1>"));
        assert!(archive_body_available(""));
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(archive_body_available("page not found 404"));
    }

    struct OnePage(&'static str);

    impl FetchAsync for OnePage {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
            Ok(FetchedPage {
                requested_url: url.into(),
                final_url: url.into(),
                status: 200,
                body: self.0.into(),
            })
        }
    }

    #[tokio::test]
    async fn test_probe_uses_archive_body() {
        let source = Source::parse("https://pub.example/").unwrap();
        assert!(!is_archive_available(&OnePage("PAGE NOT FOUND 404"), &source).await.unwrap());
        assert!(is_archive_available(&OnePage("<div>archive</div>"), &source).await.unwrap());
    }
}
