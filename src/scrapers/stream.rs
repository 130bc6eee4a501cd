//! Archive stream markup scraper.
//!
//! Server-rendered archive month pages list each post as a
//! `div.streamItem--postPreview` card. Every field comes from its own
//! sub-element and is looked up independently:
//!
//! | Field | Element |
//! |-------|---------|
//! | author | `div.postMetaInline-authorLockup a` (text) |
//! | date | `div.ui-caption time` (`datetime`) |
//! | reading time | `div.ui-caption span.readingTime` (`title`, else text) |
//! | title | `div.section-inner h3` inside `div.postArticle-content` (text) |
//! | post URL | anchor enclosing `div.postArticle-content` (`href`) |
//! | preview image | first `figure img` inside the content block (`src`) |
//! | claps | last `span` in `div.multirecommend` (text) |

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use super::ExtractionStrategy;
use crate::models::RawPost;

pub const NAME: &str = "stream-item";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static POST_PREVIEW: Lazy<Selector> = Lazy::new(|| selector("div.streamItem--postPreview"));
static AUTHOR_LINK: Lazy<Selector> = Lazy::new(|| selector("div.postMetaInline-authorLockup a"));
static CAPTION_TIME: Lazy<Selector> = Lazy::new(|| selector("div.ui-caption time"));
static READING_TIME: Lazy<Selector> = Lazy::new(|| selector("div.ui-caption span.readingTime"));
static ARTICLE_CONTENT: Lazy<Selector> = Lazy::new(|| selector("div.postArticle-content"));
static SECTION_TITLE: Lazy<Selector> = Lazy::new(|| {
    selector("section.section > div.section-content > div.section-inner h3")
});
static ANY_TITLE: Lazy<Selector> = Lazy::new(|| selector("h3"));
static FIGURE_IMAGE: Lazy<Selector> = Lazy::new(|| selector("figure img"));
static RECOMMEND_SPAN: Lazy<Selector> = Lazy::new(|| selector("div.multirecommend span"));

/// Strategy for the `streamItem--postPreview` archive markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamItemStrategy;

impl ExtractionStrategy for StreamItemStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(level = "debug", skip_all)]
    fn extract_posts(&self, document: &Html) -> Vec<RawPost> {
        let mut posts = Vec::new();
        let mut dropped = 0usize;

        for container in document.select(&POST_PREVIEW) {
            let post = extract_post(container);
            if post.is_empty() {
                dropped += 1;
                continue;
            }
            posts.push(post);
        }

        debug!(count = posts.len(), dropped, "Extracted stream posts");
        posts
    }
}

/// Extract one post card. Missing elements leave fields unset.
fn extract_post(container: ElementRef<'_>) -> RawPost {
    let content = container.select(&ARTICLE_CONTENT).next();

    RawPost {
        author: first_text(container, &AUTHOR_LINK),
        date: container
            .select(&CAPTION_TIME)
            .find_map(|time| attr(time, "datetime")),
        reading_time: container
            .select(&READING_TIME)
            .next()
            .and_then(|span| attr(span, "title").or_else(|| text(span))),
        title: content.and_then(|c| first_text(c, &SECTION_TITLE).or_else(|| first_text(c, &ANY_TITLE))),
        post_url: content.and_then(enclosing_href),
        preview_image_url: content
            .and_then(|c| c.select(&FIGURE_IMAGE).next())
            .and_then(|img| attr(img, "src")),
        claps: container
            .select(&RECOMMEND_SPAN)
            .last()
            .and_then(text),
    }
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn text(element: ElementRef<'_>) -> Option<String> {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).find_map(text)
}

/// `href` of the nearest `<a>` wrapping the content block.
fn enclosing_href(content: ElementRef<'_>) -> Option<String> {
    content
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
        .and_then(|a| attr(a, "href"))
}
