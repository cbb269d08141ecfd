//! Collection pipeline: every source → extraction → dedupe → scoring → ranking.
//!
//! Sources are extracted with at most `concurrency` in flight. Results come
//! back in declaration order no matter which finishes first, so the dedupe
//! survivor of a duplicate cluster is always the item from the earliest
//! declared source.

use crate::config::ScoringWeights;
use crate::dedupe::dedupe;
use crate::fetcher::Fetch;
use crate::models::{CandidateItem, SourceDescriptor};
use crate::scoring::{rank, score_all};
use crate::scrapers;
use crate::window::CoverageWindow;
use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

/// Extract every source and concatenate the results in declaration order.
///
/// A source that fails is logged and contributes nothing.
pub async fn collect_sources<F: Fetch>(
    sources: &[SourceDescriptor],
    window: &CoverageWindow,
    fetcher: &F,
    concurrency: usize,
) -> Vec<CandidateItem> {
    let per_source: Vec<Vec<CandidateItem>> = stream::iter(sources)
        .map(|descriptor| async move {
            match scrapers::extract(descriptor, fetcher, window).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        source = %descriptor.name,
                        url = %descriptor.url,
                        error = %e,
                        "Source failed; skipping"
                    );
                    Vec::new()
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    per_source.into_iter().flatten().collect()
}

/// Run the whole collection pipeline and return the ranked item list.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), days = window.days()))]
pub async fn collect_items<F: Fetch>(
    sources: &[SourceDescriptor],
    window: &CoverageWindow,
    weights: &ScoringWeights,
    fetcher: &F,
    concurrency: usize,
) -> Vec<CandidateItem> {
    let collected = collect_sources(sources, window, fetcher, concurrency).await;
    info!(count = collected.len(), "Collected items from all sources");

    let mut items = dedupe(collected);
    score_all(&mut items, weights);
    rank(&mut items);

    info!(count = items.len(), "Ranked items");
    items
}
