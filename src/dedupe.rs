//! Near-duplicate removal across sources.
//!
//! Titles are normalized (lowercase, punctuation to spaces, collapsed
//! whitespace) and compared with a token-set ratio on a 0–100 scale. A
//! candidate scoring at or above the threshold against any already-kept item
//! is dropped outright; nothing is merged into the survivor, so the item from
//! the earliest-declared source always wins even if a later copy would have
//! scored higher.
//!
//! The scan is pairwise against kept items, O(n²). Runs are a few hundred
//! items at most. A larger corpus would need a token-shingle index that still
//! keeps the first-seen item of each cluster.

use crate::models::CandidateItem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Similarity at or above which two titles are the same story.
pub const DUPLICATE_THRESHOLD: f64 = 92.0;

static RE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercase, replace every non-word/non-space character with a space, and
/// collapse runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let spaced = RE_PUNCT.replace_all(&lowered, " ");
    RE_WS.replace_all(&spaced, " ").trim().to_string()
}

/// Length of the longest common subsequence, by `char`.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Insertions plus deletions needed to turn `a` into `b`.
fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

fn normalized_similarity(distance: usize, total_len: usize) -> f64 {
    if total_len == 0 {
        return 100.0;
    }
    100.0 * (1.0 - distance as f64 / total_len as f64)
}

/// Order-insensitive, set-based token similarity in `[0, 100]`.
///
/// Shared tokens form a common prefix; the score is the best of
/// `sect` vs `sect + rest_a`, `sect` vs `sect + rest_b` and
/// `sect + rest_a` vs `sect + rest_b` (each with sorted tokens). If one title's
/// tokens are a subset of the other's, the score is 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect_joined = sect.join(" ");
    let ab_joined = diff_ab.join(" ");
    let ba_joined = diff_ba.join(" ");

    let sect_len = sect_joined.chars().count();
    let ab_len = ab_joined.chars().count();
    let ba_len = ba_joined.chars().count();
    let sep = usize::from(sect_len > 0);

    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    // The shared prefix cancels out, so only the differences cost anything.
    let combined = normalized_similarity(
        indel_distance(&ab_joined, &ba_joined),
        sect_ab_len + sect_ba_len,
    );
    if sect_len == 0 {
        return combined;
    }

    let sect_ab = normalized_similarity(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba = normalized_similarity(sep + ba_len, sect_len + sect_ba_len);
    combined.max(sect_ab).max(sect_ba)
}

/// Drop near-duplicates, keeping the first occurrence of each story.
pub fn dedupe(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    dedupe_with_threshold(items, DUPLICATE_THRESHOLD)
}

pub fn dedupe_with_threshold(items: Vec<CandidateItem>, threshold: f64) -> Vec<CandidateItem> {
    let before = items.len();
    let mut kept: Vec<CandidateItem> = Vec::with_capacity(items.len());
    let mut kept_titles: Vec<String> = Vec::with_capacity(items.len());

    for item in items {
        let title = normalize_title(&item.title);
        let duplicate_of = kept_titles
            .iter()
            .position(|seen| token_set_ratio(&title, seen) >= threshold);

        match duplicate_of {
            Some(idx) => {
                debug!(
                    dropped = %item.title,
                    dropped_source = %item.source,
                    kept = %kept[idx].title,
                    kept_source = %kept[idx].source,
                    "Dropping near-duplicate"
                );
            }
            None => {
                kept_titles.push(title);
                kept.push(item);
            }
        }
    }

    info!(before, after = kept.len(), "Deduplicated items");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, title: &str) -> CandidateItem {
        CandidateItem::new(source, title, format!("https://{source}.example/x"), "", "")
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("Company X raises $10M Series-A!"),
            "company x raises 10m series a"
        );
        assert_eq!(normalize_title("  Multiple\t\tspaces  "), "multiple spaces");
        assert_eq!(normalize_title("snake_case stays"), "snake_case stays");
    }

    #[test]
    fn test_token_set_ratio_subset_is_full_match() {
        assert_eq!(
            token_set_ratio("fuzzy wuzzy was a bear", "fuzzy fuzzy was a bear"),
            100.0
        );
    }

    #[test]
    fn test_token_set_ratio_is_order_insensitive() {
        assert_eq!(
            token_set_ratio("outage hits region east", "east region outage hits"),
            100.0
        );
    }

    #[test]
    fn test_token_set_ratio_partial_overlap() {
        // sect "new york", rests "mets"/"yankees": best is 1 - 5/21.
        let r = token_set_ratio("new york mets", "new york yankees");
        assert!((r - 76.1905).abs() < 0.01, "got {r}");
    }

    #[test]
    fn test_token_set_ratio_disjoint_and_empty() {
        assert!(token_set_ratio("apple ships phone", "google updates pixel") < 50.0);
        assert_eq!(token_set_ratio("", "anything"), 0.0);
        assert_eq!(token_set_ratio("same", "same"), 100.0);
    }

    #[test]
    fn test_dedupe_keeps_first_declared() {
        let items = vec![
            item("first", "Company X raises $10M Series A"),
            item("second", "company x raises $10m series a funding round"),
        ];
        let kept = dedupe(items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, "first");
    }

    #[test]
    fn test_dedupe_discards_later_duplicate_without_merge() {
        let mut later = item("later", "Critical patch released for gateway");
        later.snippet = "critical vulnerability details".to_string();
        let items = vec![item("early", "Critical patch released for gateway"), later];
        let kept = dedupe(items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, "early");
        assert!(kept[0].snippet.is_empty());
    }

    #[test]
    fn test_dedupe_preserves_order_of_distinct_items() {
        let items = vec![
            item("a", "Regulator publishes new data rules"),
            item("b", "Cloud provider reports regional outage"),
            item("c", "Chipmaker opens new fab in Arizona"),
        ];
        let kept = dedupe(items);
        let sources: Vec<&str> = kept.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let items = vec![item("a", "new york mets"), item("b", "new york yankees")];
        assert_eq!(dedupe_with_threshold(items.clone(), 76.0).len(), 1);
        assert_eq!(dedupe_with_threshold(items, 77.0).len(), 2);
    }
}
