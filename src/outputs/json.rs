//! JSON output of the finished brief.
//!
//! The file mirrors [`Brief`] field for field so that other tools can pick
//! up the ranked items without re-running collection.

use super::output_path;
use crate::models::Brief;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `brief` to `{output_dir}/monthly_intel_{brief_date}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_brief(brief: &Brief, output_dir: &str) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(brief)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = output_path(output_dir, &brief.brief_date, "json");
    fs::write(&path, json).await?;
    info!(%path, items = brief.items.len(), "Wrote JSON brief");
    Ok(path)
}
