//! Data models for sources, candidate items and the rendered brief.
//!
//! - [`SourceDescriptor`]: one configured feed or page, read-only after startup
//! - [`CandidateItem`]: the record that flows from extraction to rendering
//! - [`SummaryRecord`]: what the language model hands back for a top item
//! - [`Brief`]: the ranked, summarized list plus report metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest snippet kept on an item, in characters.
pub const SNIPPET_MAX_CHARS: usize = 800;

/// Executive action used when the summarizer leaves the field empty.
pub const DEFAULT_EXEC_ACTION: &str = "Review relevance and add to backlog.";

/// How a source is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// RSS or Atom syndication feed.
    Feed,
    /// Plain HTML page whose long anchors are taken as items.
    Page,
}

impl SourceKind {
    /// Map the `type` field of a source entry. Only `rss` (and the
    /// `feed`/`atom` spellings) select the feed reader; anything else is
    /// treated as a page.
    pub fn from_type(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "rss" | "feed" | "atom" => SourceKind::Feed,
            _ => SourceKind::Page,
        }
    }
}

/// A configured source, grouped under a category.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub category: String,
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    pub weight: f64,
}

/// Time-sensitivity label assigned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    #[default]
    Low,
}

impl Urgency {
    /// Secondary sort key: High=2, Medium=1, Low=0.
    pub fn rank(self) -> u8 {
        match self {
            Urgency::High => 2,
            Urgency::Medium => 1,
            Urgency::Low => 0,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Urgency::High => "High",
            Urgency::Medium => "Medium",
            Urgency::Low => "Low",
        };
        f.write_str(label)
    }
}

/// One discovered story or link.
///
/// `title` and `link` are never empty once an item leaves extraction.
/// `date` is `YYYY-MM-DD` or empty; empty means the entry carried no date and
/// was never subject to the coverage window. `impact` and `urgency` are
/// written by the scorer, the summary fields by the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateItem {
    pub source: String,
    pub title: String,
    pub link: String,
    pub date: String,
    pub snippet: String,
    pub category: String,
    /// The owning source's configured weight. Carried into the brief for
    /// readers; impact is driven by the category weight, not this field.
    pub weight: f64,
    pub impact: f64,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub headline: String,
    pub summary: String,
    pub exec_action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CandidateItem {
    /// A freshly extracted item; category and weight are filled in by
    /// [`CandidateItem::assign_source`], scores by the scorer.
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        date: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            link: link.into(),
            date: date.into(),
            snippet: snippet.into(),
            category: String::new(),
            weight: 1.0,
            impact: 1.0,
            urgency: Urgency::Low,
            headline: String::new(),
            summary: String::new(),
            exec_action: String::new(),
            tags: Vec::new(),
        }
    }

    /// Copy category and weight from the owning descriptor.
    pub fn assign_source(&mut self, descriptor: &SourceDescriptor) {
        self.category = descriptor.category.clone();
        self.weight = descriptor.weight;
    }

    /// Text the scorer matches keywords against: `"{title} {snippet}"`, lowercased.
    pub fn score_text(&self) -> String {
        format!("{} {}", self.title, self.snippet).to_lowercase()
    }

    /// Merge a summarizer record into the item.
    pub fn apply_summary(&mut self, record: SummaryRecord) {
        self.headline = record.headline;
        self.summary = if record.summary.trim().is_empty() {
            self.snippet.clone()
        } else {
            record.summary
        };
        self.exec_action = if record.exec_action.trim().is_empty() {
            DEFAULT_EXEC_ACTION.to_string()
        } else {
            record.exec_action
        };
        self.tags = record.tags;
    }
}

/// Structured answer from the summarizer for one item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub exec_action: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SummaryRecord {
    /// Record used whenever the summarizer cannot produce a usable answer.
    pub fn fallback() -> Self {
        Self {
            headline: String::new(),
            summary: "Summary unavailable (LLM not reachable). Link included above.".to_string(),
            exec_action: "Skim source; assess relevance".to_string(),
            tags: Vec::new(),
        }
    }
}

/// The finished report handed to the renderers.
#[derive(Debug, Serialize)]
pub struct Brief {
    /// Local date of the run in `YYYY-MM-DD` format.
    pub brief_date: String,
    pub audience: String,
    pub org_priorities: Vec<String>,
    pub timezone: String,
    pub coverage_days: i64,
    /// First day of the coverage window, in the configured timezone.
    pub coverage_start: String,
    /// Last day of the coverage window, in the configured timezone.
    pub coverage_end: String,
    /// Ranked and summarized items, best first.
    pub items: Vec<CandidateItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SourceDescriptor {
        SourceDescriptor {
            category: "tech".to_string(),
            name: "Example Wire".to_string(),
            kind: SourceKind::Feed,
            url: "https://example.com/feed.xml".to_string(),
            weight: 1.5,
        }
    }

    #[test]
    fn test_source_kind_from_type() {
        assert_eq!(SourceKind::from_type("rss"), SourceKind::Feed);
        assert_eq!(SourceKind::from_type(" RSS "), SourceKind::Feed);
        assert_eq!(SourceKind::from_type("atom"), SourceKind::Feed);
        assert_eq!(SourceKind::from_type("page"), SourceKind::Page);
        assert_eq!(SourceKind::from_type("html"), SourceKind::Page);
    }

    #[test]
    fn test_urgency_rank_order() {
        assert!(Urgency::High.rank() > Urgency::Medium.rank());
        assert!(Urgency::Medium.rank() > Urgency::Low.rank());
        assert_eq!(Urgency::default(), Urgency::Low);
    }

    #[test]
    fn test_assign_source_copies_category_and_weight() {
        let mut item = CandidateItem::new("Example Wire", "Title", "https://x", "", "");
        item.assign_source(&descriptor());
        assert_eq!(item.category, "tech");
        assert_eq!(item.weight, 1.5);
    }

    #[test]
    fn test_score_text_is_lowercased_title_and_snippet() {
        let item = CandidateItem::new("s", "Critical Outage", "https://x", "", "Data CENTER");
        assert_eq!(item.score_text(), "critical outage data center");
    }

    #[test]
    fn test_apply_summary_fills_defaults() {
        let mut item = CandidateItem::new("s", "Title", "https://x", "", "the snippet");
        item.apply_summary(SummaryRecord {
            headline: "Head".to_string(),
            summary: "  ".to_string(),
            exec_action: String::new(),
            tags: vec!["ops".to_string()],
        });
        assert_eq!(item.headline, "Head");
        assert_eq!(item.summary, "the snippet");
        assert_eq!(item.exec_action, DEFAULT_EXEC_ACTION);
        assert_eq!(item.tags, vec!["ops".to_string()]);
    }

    #[test]
    fn test_fallback_record_text() {
        let fb = SummaryRecord::fallback();
        assert_eq!(fb.headline, "");
        assert_eq!(
            fb.summary,
            "Summary unavailable (LLM not reachable). Link included above."
        );
        assert_eq!(fb.exec_action, "Skim source; assess relevance");
        assert!(fb.tags.is_empty());
    }

    #[test]
    fn test_summary_record_deserializes_partial_json() {
        let rec: SummaryRecord = serde_json::from_str(r#"{"summary":"Short"}"#).unwrap();
        assert_eq!(rec.summary, "Short");
        assert!(rec.headline.is_empty());
        assert!(rec.tags.is_empty());
    }

    #[test]
    fn test_item_serialization_skips_empty_optional_fields() {
        let item = CandidateItem::new("s", "Title", "https://x", "2025-05-06", "");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"urgency\":\"Low\""));
        assert!(!json.contains("headline"));
        assert!(!json.contains("tags"));
    }
}
