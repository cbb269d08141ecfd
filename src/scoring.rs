//! Impact/urgency scoring and the final ranking.
//!
//! impact = clamp(round1(2.5 + (base - 1.0) * 2 + Σ(weight - 1.0)), 1, 5)
//!
//! where `base` is the category's configured weight (1.0 when absent) and the
//! sum runs over keywords found in the lowercased `"title snippet"` text.
//! Urgency is picked from three keyword tiers checked High → Medium → Low.

use crate::config::ScoringWeights;
use crate::models::{CandidateItem, Urgency};
use std::cmp::Ordering;

const HIGH_URGENCY: &[&str] = &["outage", "vulnerability", "critical", "emergency", "urgent"];
const MEDIUM_URGENCY: &[&str] = &["regulation", "deadline", "effective", "effective from"];

pub const MIN_IMPACT: f64 = 1.0;
pub const MAX_IMPACT: f64 = 5.0;

/// One decimal place, rounded on the exact binary value with ties to even:
/// 2.65 (stored as 2.6499...) gives 2.6 and 2.75 gives 2.8.
fn round_one_decimal(x: f64) -> f64 {
    format!("{x:.1}").parse().unwrap_or(x)
}

/// Urgency tier for already-lowercased text. First matching tier wins.
pub fn urgency_for(text: &str) -> Urgency {
    if HIGH_URGENCY.iter().any(|k| text.contains(k)) {
        Urgency::High
    } else if MEDIUM_URGENCY.iter().any(|k| text.contains(k)) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Compute `(impact, urgency)` for an item scored under `category`.
pub fn score_item(item: &CandidateItem, category: &str, weights: &ScoringWeights) -> (f64, Urgency) {
    let base = weights
        .base_source_weight
        .get(category)
        .copied()
        .unwrap_or(1.0);
    let text = item.score_text();

    let keyword_bonus: f64 = weights
        .keywords
        .iter()
        .filter(|(keyword, _)| text.contains(keyword.to_lowercase().as_str()))
        .map(|(_, weight)| weight - 1.0)
        .sum();

    let raw = 2.5 + (base - 1.0) * 2.0 + keyword_bonus;
    let impact = round_one_decimal(raw).clamp(MIN_IMPACT, MAX_IMPACT);
    (impact, urgency_for(&text))
}

/// Score every item in place using its own category.
pub fn score_all(items: &mut [CandidateItem], weights: &ScoringWeights) {
    for item in items.iter_mut() {
        let (impact, urgency) = score_item(item, &item.category, weights);
        item.impact = impact;
        item.urgency = urgency;
    }
}

/// Stable sort, best first, by `(impact, urgency rank)`. Full ties keep
/// their input order.
pub fn rank(items: &mut [CandidateItem]) {
    items.sort_by(|a, b| {
        b.impact
            .partial_cmp(&a.impact)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.urgency.rank().cmp(&a.urgency.rank()))
    });
}
