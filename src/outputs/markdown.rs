//! Markdown rendering of a [`Brief`].
//!
//! Layout:
//!
//! ```text
//! # Monthly Intelligence Brief (2025-06-30)
//! audience, coverage line, org priorities
//! ## Contents        (links to every item)
//! ## Top Items
//! ### 1. Headline   (impact, urgency, source, date, link, summary, action, tags)
//! ```

use super::output_path;
use crate::models::{Brief, CandidateItem};
use crate::utils::slugify_title;
use std::error::Error;
use std::fmt::{self, Write};
use tokio::fs;
use tracing::{info, instrument};

/// The item's display heading: the model's headline when it gave one.
fn heading(item: &CandidateItem) -> &str {
    if item.headline.trim().is_empty() {
        &item.title
    } else {
        &item.headline
    }
}

fn render(brief: &Brief, md: &mut String) -> fmt::Result {
    writeln!(md, "# Monthly Intelligence Brief ({})", brief.brief_date)?;
    writeln!(md)?;
    if !brief.audience.is_empty() {
        writeln!(md, "**Audience:** {}  ", brief.audience)?;
    }
    writeln!(
        md,
        "**Coverage:** {} to {} ({} days, {})",
        brief.coverage_start, brief.coverage_end, brief.coverage_days, brief.timezone
    )?;
    writeln!(md)?;

    if !brief.org_priorities.is_empty() {
        writeln!(md, "## Organisation Priorities")?;
        writeln!(md)?;
        for p in &brief.org_priorities {
            writeln!(md, "- {p}")?;
        }
        writeln!(md)?;
    }

    if brief.items.is_empty() {
        writeln!(md, "_No items found in the coverage window._")?;
        return Ok(());
    }

    writeln!(md, "## Contents")?;
    writeln!(md)?;
    for (i, item) in brief.items.iter().enumerate() {
        let title = format!("{}. {}", i + 1, heading(item));
        writeln!(md, "- [{}](#{})", title, slugify_title(&title))?;
    }
    writeln!(md)?;

    writeln!(md, "## Top Items")?;
    writeln!(md)?;
    for (i, item) in brief.items.iter().enumerate() {
        writeln!(md, "### {}. {}", i + 1, heading(item))?;
        writeln!(md)?;
        writeln!(
            md,
            "**Impact:** {:.1} | **Urgency:** {} | **Source:** {} ({})",
            item.impact, item.urgency, item.source, item.category
        )?;
        if !item.date.is_empty() {
            writeln!(md, "**Published:** {}  ", item.date)?;
        }
        writeln!(md, "**Link:** <{}>", item.link)?;
        writeln!(md)?;
        if !item.summary.is_empty() {
            writeln!(md, "{}", item.summary)?;
            writeln!(md)?;
        }
        if !item.exec_action.is_empty() {
            writeln!(md, "> **Executive action:** {}", item.exec_action)?;
            writeln!(md)?;
        }
        if !item.tags.is_empty() {
            let tags: Vec<String> = item.tags.iter().map(|t| format!("`{t}`")).collect();
            writeln!(md, "Tags: {}", tags.join(" "))?;
            writeln!(md)?;
        }
    }
    Ok(())
}

/// Render the whole brief as a Markdown document.
pub fn brief_to_markdown(brief: &Brief) -> Result<String, fmt::Error> {
    let mut md = String::new();
    render(brief, &mut md)?;
    Ok(md)
}

/// Write the Markdown brief next to the JSON one. Returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_markdown(brief: &Brief, output_dir: &str) -> Result<String, Box<dyn Error>> {
    let path = output_path(output_dir, &brief.brief_date, "md");
    let md = brief_to_markdown(brief)?;
    fs::write(&path, md).await?;
    info!(%path, "Wrote Markdown brief");
    Ok(path)
}
