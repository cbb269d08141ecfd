//! Extractors that turn a configured source into candidate items.
//!
//! Every source goes through the same two steps:
//!
//! 1. **Fetching**: download the body through a [`Fetch`] implementation
//! 2. **Extraction**: parse the body into [`CandidateItem`]s
//!
//! # Source Kinds
//!
//! | Kind | Module | Yields | Notes |
//! |------|--------|--------|-------|
//! | Feed | [`feed`] | up to 100 entries | RSS 2.0, RSS 1.0 (RDF), Atom; coverage window applied |
//! | Page | [`page`] | up to 20 anchors | anchors with ≥30 chars of text; no date or snippet |
//!
//! Each extracted item then receives `category` and `weight` from the owning
//! [`SourceDescriptor`]. A failure here only affects that one source.

pub mod feed;
pub mod page;

use crate::errors::ExtractError;
use crate::fetcher::Fetch;
use crate::models::{CandidateItem, SourceDescriptor, SourceKind};
use crate::window::CoverageWindow;

/// Fetch and extract one source, tagging every item with the source's
/// category and weight.
pub async fn extract<F: Fetch>(
    descriptor: &SourceDescriptor,
    fetcher: &F,
    window: &CoverageWindow,
) -> Result<Vec<CandidateItem>, ExtractError> {
    let mut items = match descriptor.kind {
        SourceKind::Feed => feed::extract_items(descriptor, fetcher, window).await?,
        SourceKind::Page => page::extract_items(descriptor, fetcher).await?,
    };
    for item in &mut items {
        item.assign_source(descriptor);
    }
    Ok(items)
}
