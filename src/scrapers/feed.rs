//! Syndication feed extractor.
//!
//! Accepts RSS 2.0 (`rss/channel/item`), RSS 1.0 (`RDF/item`) and Atom
//! (`feed/entry`). The root element decides which shape is deserialized.
//!
//! Per entry (first 100 only): title, link, published-or-updated date, and a
//! plain-text snippet of at most 800 characters. An entry that carries a date
//! must fall inside the coverage window; an entry with no date at all skips
//! the window check and is kept.

use crate::errors::{ExtractError, ParseError};
use crate::fetcher::Fetch;
use crate::models::{CandidateItem, SNIPPET_MAX_CHARS, SourceDescriptor};
use crate::utils::{clean_html, collapse_whitespace, truncate_chars};
use crate::window::{CoverageWindow, display_date};
use html_escape::{decode_html_entities, encode_text};
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::borrow::Cow;
use tracing::{debug, info, instrument};

/// Entries read per feed.
pub const MAX_FEED_ENTRIES: usize = 100;

/// Text content of an element plus the attributes feeds put on it.
///
/// Elements are collected into `Vec`s so that a namespaced sibling with the
/// same local name (`atom:link`, `media:title`) never collides with the one
/// we want.
#[derive(Debug, Default, Deserialize)]
struct Node {
    #[serde(rename = "$text", default)]
    text: String,
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

impl Node {
    fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Text with markup removed when the element declares HTML content.
    fn plain(&self) -> String {
        match self.kind.as_deref() {
            Some("html") | Some("xhtml") | Some("text/html") => clean_html(&self.text),
            _ => collapse_whitespace(&self.text),
        }
    }
}

fn first_text(nodes: &[Node]) -> Option<&Node> {
    nodes.iter().find(|n| !n.trimmed().is_empty())
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// RSS 1.0 puts items next to the channel rather than inside it.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(rename = "title", default)]
    titles: Vec<Node>,
    #[serde(rename = "link", default)]
    links: Vec<Node>,
    #[serde(rename = "pubDate", default)]
    pub_dates: Vec<Node>,
    #[serde(rename = "date", alias = "dc:date", default)]
    dc_dates: Vec<Node>,
    #[serde(rename = "description", default)]
    descriptions: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "title", default)]
    titles: Vec<Node>,
    #[serde(rename = "link", default)]
    links: Vec<Node>,
    #[serde(default)]
    published: Vec<Node>,
    #[serde(default)]
    updated: Vec<Node>,
    #[serde(default)]
    summary: Vec<Node>,
    #[serde(default)]
    content: Vec<Node>,
}

/// One entry in a format-neutral shape, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// Empty when the entry has no usable link.
    pub link: String,
    /// Raw published (or updated) string; empty when the entry has neither.
    pub date: String,
    /// Raw summary/description, possibly HTML.
    pub summary: String,
}

impl From<RssItem> for FeedEntry {
    fn from(item: RssItem) -> Self {
        let link = item
            .links
            .iter()
            .find_map(|n| {
                let text = n.trimmed();
                if !text.is_empty() {
                    Some(text.to_string())
                } else {
                    n.href.as_deref().map(str::trim).filter(|h| !h.is_empty()).map(str::to_string)
                }
            })
            .unwrap_or_default();

        FeedEntry {
            title: first_text(&item.titles).map(|n| n.trimmed().to_string()).unwrap_or_default(),
            link,
            date: first_text(&item.pub_dates)
                .or_else(|| first_text(&item.dc_dates))
                .map(|n| n.trimmed().to_string())
                .unwrap_or_default(),
            summary: first_text(&item.descriptions)
                .map(|n| n.text.clone())
                .unwrap_or_default(),
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(entry: AtomEntry) -> Self {
        let hrefs = || entry.links.iter().filter_map(|n| n.href.as_deref().map(str::trim));
        let alternate = entry
            .links
            .iter()
            .filter(|n| matches!(n.rel.as_deref(), None | Some("alternate")))
            .filter_map(|n| n.href.as_deref().map(str::trim))
            .find(|h| !h.is_empty());
        let link = alternate
            .or_else(|| hrefs().find(|h| !h.is_empty()))
            .unwrap_or_default()
            .to_string();

        FeedEntry {
            title: first_text(&entry.titles).map(Node::plain).unwrap_or_default(),
            link,
            date: first_text(&entry.published)
                .or_else(|| first_text(&entry.updated))
                .map(|n| n.trimmed().to_string())
                .unwrap_or_default(),
            summary: first_text(&entry.summary)
                .or_else(|| first_text(&entry.content))
                .map(|n| n.text.clone())
                .unwrap_or_default(),
        }
    }
}

/// `&name;` references; XML itself only defines the five in [`XML_ENTITIES`].
static NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("valid entity regex"));

const XML_ENTITIES: &[&str] = &["lt", "gt", "amp", "quot", "apos"];

/// Rewrite HTML named entities (`&eacute;`, `&copy;`, `&nbsp;`...) that XML
/// parsers reject. Known entities become their character, escaped again where
/// XML needs it; unknown ones are kept as literal text.
fn scrub_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    NAMED_ENTITY.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        if XML_ENTITIES.contains(&name) {
            return caps[0].to_string();
        }
        let decoded = decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            format!("&amp;{name};")
        } else {
            encode_text(&decoded).into_owned()
        }
    })
}

/// Local name of the document's root element.
fn root_element(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(ParseError::Feed("document has no root element".into())),
            Ok(_) => {}
            Err(e) => return Err(ParseError::Feed(e.to_string())),
        }
    }
}

/// Parse any supported feed document into entries, in document order.
pub fn parse_entries(body: &str) -> Result<Vec<FeedEntry>, ParseError> {
    let xml = scrub_html_entities_for_xml(body.trim_start_matches('\u{feff}'));
    let malformed = |e: quick_xml::de::DeError| ParseError::Feed(e.to_string());

    let entries = match root_element(&xml)?.as_str() {
        "rss" => {
            let rss: Rss = quick_xml::de::from_str(&xml).map_err(malformed)?;
            rss.channel.items.into_iter().map(FeedEntry::from).collect()
        }
        "RDF" => {
            let rdf: Rdf = quick_xml::de::from_str(&xml).map_err(malformed)?;
            rdf.items.into_iter().map(FeedEntry::from).collect()
        }
        "feed" => {
            let atom: Atom = quick_xml::de::from_str(&xml).map_err(malformed)?;
            atom.entries.into_iter().map(FeedEntry::from).collect()
        }
        other => return Err(ParseError::UnknownFeedFormat(other.to_string())),
    };
    Ok(entries)
}

/// Turn a feed body into window-filtered items for `source`.
pub fn parse_feed_items(
    source: &str,
    body: &str,
    window: &CoverageWindow,
) -> Result<Vec<CandidateItem>, ParseError> {
    let entries = parse_entries(body)?;
    let total = entries.len();
    let mut out_of_window = 0usize;
    let mut incomplete = 0usize;
    let mut items = Vec::new();

    for entry in entries.into_iter().take(MAX_FEED_ENTRIES) {
        // Undated entries are never window-checked.
        if !entry.date.is_empty() && !window.contains(&entry.date) {
            out_of_window += 1;
            continue;
        }
        if entry.title.is_empty() || entry.link.is_empty() {
            incomplete += 1;
            continue;
        }

        let date = if entry.date.is_empty() {
            String::new()
        } else {
            display_date(&entry.date)
        };
        let snippet = truncate_chars(&clean_html(&entry.summary), SNIPPET_MAX_CHARS);
        items.push(CandidateItem::new(source, entry.title, entry.link, date, snippet));
    }

    debug!(
        total,
        kept = items.len(),
        out_of_window,
        incomplete,
        "Filtered feed entries"
    );
    Ok(items)
}

/// Fetch and extract a feed source.
#[instrument(level = "info", skip_all, fields(source = %descriptor.name, url = %descriptor.url))]
pub async fn extract_items<F: Fetch>(
    descriptor: &SourceDescriptor,
    fetcher: &F,
    window: &CoverageWindow,
) -> Result<Vec<CandidateItem>, ExtractError> {
    let body = fetcher.fetch(&descriptor.url).await?;
    let items = parse_feed_items(&descriptor.name, &body, window)?;
    info!(count = items.len(), "Extracted feed items");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> CoverageWindow {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        CoverageWindow::anchored(30, chrono_tz::Asia::Singapore, now)
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example Wire</title>
    <atom:link href="https://example.com/feed.xml" rel="self" type="application/rss+xml"/>
    <item>
      <title>  Regional outage hits payment processors  </title>
      <link>https://example.com/outage</link>
      <pubDate>Tue, 24 Jun 2025 08:00:00 +0000</pubDate>
      <description><![CDATA[<p>Card payments <b>failed</b> for&nbsp;hours.</p>]]></description>
    </item>
    <item>
      <title>Old news from last year</title>
      <link>https://example.com/old</link>
      <pubDate>Mon, 24 Jun 2024 08:00:00 +0000</pubDate>
      <description>Stale</description>
    </item>
    <item>
      <title>Undated evergreen guide</title>
      <link>https://example.com/guide</link>
      <description>Always relevant</description>
    </item>
    <item>
      <title>Broken date entry</title>
      <link>https://example.com/broken</link>
      <pubDate>sometime soon</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Vendor Blog</title>
  <entry>
    <title type="html">Patch &lt;b&gt;critical&lt;/b&gt; flaw</title>
    <link rel="replies" href="https://blog.example.com/1#comments"/>
    <link rel="alternate" href="https://blog.example.com/1"/>
    <id>urn:1</id>
    <updated>2025-06-25T10:00:00Z</updated>
    <published>2025-06-20T23:30:00-05:00</published>
    <summary type="html">&lt;p&gt;Apply the fix today.&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Only updated date</title>
    <link href="https://blog.example.com/2"/>
    <updated>2025-06-28T10:00:00Z</updated>
    <content type="html">&lt;div&gt;Body text&lt;/div&gt;</content>
  </entry>
</feed>"#;

    const RDF: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.org/"><title>Agency</title></channel>
  <item rdf:about="https://example.org/a">
    <title>Agency sets compliance deadline</title>
    <link>https://example.org/a</link>
    <dc:date>2025-06-29T09:00:00+09:00</dc:date>
  </item>
</rdf:RDF>"#;

    #[test]
    fn test_rss_entries_are_normalized() {
        let entries = parse_entries(RSS).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].title, "Regional outage hits payment processors");
        assert_eq!(entries[0].link, "https://example.com/outage");
        assert_eq!(entries[0].date, "Tue, 24 Jun 2025 08:00:00 +0000");
        assert!(entries[2].date.is_empty());
    }

    #[test]
    fn test_rss_window_and_undated_bypass() {
        let items = parse_feed_items("Example Wire", RSS, &window()).unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Regional outage hits payment processors", "Undated evergreen guide"]
        );
        assert_eq!(items[0].date, "2025-06-24");
        assert_eq!(items[0].snippet, "Card payments failed for hours.");
        assert_eq!(items[0].source, "Example Wire");
        assert_eq!(items[1].date, "");
        assert_eq!(items[1].snippet, "Always relevant");
    }

    #[test]
    fn test_atom_entries() {
        let items = parse_feed_items("Vendor Blog", ATOM, &window()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Patch critical flaw");
        assert_eq!(items[0].link, "https://blog.example.com/1");
        // Published wins over updated and keeps the publisher's calendar day.
        assert_eq!(items[0].date, "2025-06-20");
        assert_eq!(items[0].snippet, "Apply the fix today.");
        assert_eq!(items[1].date, "2025-06-28");
        assert_eq!(items[1].snippet, "Body text");
    }

    #[test]
    fn test_rdf_entries_use_dc_date() {
        let items = parse_feed_items("Agency", RDF, &window()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].date, "2025-06-29");
    }

    #[test]
    fn test_entry_cap() {
        let recent = (Utc::now() - Duration::days(1)).to_rfc2822();
        let mut xml = String::from("<rss><channel>");
        for i in 0..150 {
            xml.push_str(&format!(
                "<item><title>Story number {i}</title><link>https://e.com/{i}</link><pubDate>{recent}</pubDate></item>"
            ));
        }
        xml.push_str("</channel></rss>");
        let live = CoverageWindow::new(30, chrono_tz::UTC);
        let items = parse_feed_items("Big", &xml, &live).unwrap();
        assert_eq!(items.len(), MAX_FEED_ENTRIES);
        assert_eq!(items[99].title, "Story number 99");
    }

    #[test]
    fn test_snippet_is_truncated() {
        let long = "word ".repeat(400);
        let xml = format!(
            "<rss><channel><item><title>Long one</title><link>https://e.com/l</link><description>{long}</description></item></channel></rss>"
        );
        let items = parse_feed_items("S", &xml, &window()).unwrap();
        assert_eq!(items[0].snippet.chars().count(), SNIPPET_MAX_CHARS);
    }

    #[test]
    fn test_entries_without_title_or_link_are_dropped() {
        let xml = "<rss><channel>\
            <item><title></title><link>https://e.com/a</link></item>\
            <item><title>No link here at all</title></item>\
            <item><title>Complete</title><link>https://e.com/c</link></item>\
            </channel></rss>";
        let items = parse_feed_items("S", xml, &window()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Complete");
    }

    #[test]
    fn test_html_entities_do_not_break_the_feed() {
        let xml = "<rss><channel>\
            <item><title>Caf&eacute; chain &copy; outage &mdash; day two</title>\
            <link>https://e.com/cafe?a=1&amp;b=2</link>\
            <description>Prices &lt;b&gt;up&lt;/b&gt; &trade; &bogus; here</description></item>\
            <item><title>Second story &amp; more</title><link>https://e.com/2</link></item>\
            <item><title>Less &LT; more</title><link>https://e.com/3</link></item>\
            </channel></rss>";
        let items = parse_feed_items("S", xml, &window()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Café chain © outage — day two");
        assert_eq!(items[0].link, "https://e.com/cafe?a=1&b=2");
        assert_eq!(items[0].snippet, "Prices up ™ &bogus; here");
        assert_eq!(items[1].title, "Second story & more");
        assert_eq!(items[2].title, "Less < more");
    }

    #[test]
    fn test_unknown_and_malformed_documents() {
        assert!(matches!(
            parse_entries("<html><body>nope</body></html>"),
            Err(ParseError::UnknownFeedFormat(name)) if name == "html"
        ));
        assert!(matches!(parse_entries(""), Err(ParseError::Feed(_))));
    }
}
