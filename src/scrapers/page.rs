//! Generic web page extractor.
//!
//! Any page that is not a feed is treated as a list of links: every anchor
//! whose visible text is at least 30 characters long becomes an item, up to
//! 20 per page. Relative hrefs are resolved against the page URL. Page items
//! carry neither a date nor a snippet, so the coverage window never applies.

use crate::errors::ExtractError;
use crate::fetcher::Fetch;
use crate::models::{CandidateItem, SourceDescriptor};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Anchors with shorter text are navigation, not stories.
pub const MIN_ANCHOR_CHARS: usize = 30;
/// Items taken from a single page.
pub const MAX_PAGE_ITEMS: usize = 20;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Resolve `href` against the page it appeared on. An href that cannot be
/// resolved is kept as written.
fn resolve(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Scan `html` for story-like anchors in document order.
pub fn parse_page_items(source: &str, page_url: &str, html: &str) -> Vec<CandidateItem> {
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let text = anchor
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.chars().count() < MIN_ANCHOR_CHARS {
            continue;
        }

        let link = resolve(base.as_ref(), href);
        debug!(%link, "Accepted anchor");
        items.push(CandidateItem::new(source, text, link, "", ""));
        if items.len() >= MAX_PAGE_ITEMS {
            break;
        }
    }

    items
}

/// Fetch and extract a page source.
#[instrument(level = "info", skip_all, fields(source = %descriptor.name, url = %descriptor.url))]
pub async fn extract_items<F: Fetch>(
    descriptor: &SourceDescriptor,
    fetcher: &F,
) -> Result<Vec<CandidateItem>, ExtractError> {
    let html = fetcher.fetch(&descriptor.url).await?;
    let items = parse_page_items(&descriptor.name, &descriptor.url, &html);
    info!(count = items.len(), "Extracted page anchors");
    Ok(items)
}
