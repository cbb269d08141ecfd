//! # Intel Brief
//!
//! A monthly intelligence brief generator. It collects recent items from a
//! configured catalog of syndication feeds and web pages, removes
//! near-duplicate stories, scores every item for business impact and
//! urgency, summarizes the top of the ranking through an OpenAI-compatible
//! LLM, and writes the result as JSON and Markdown.
//!
//! ## Usage
//!
//! ```sh
//! intel_brief -s config/sources.yaml -p config/profile.yaml -o output
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Collection**: fetch every source and extract candidate items, keeping
//!    only dated entries inside the coverage window
//! 2. **Dedupe**: drop later items whose title is a fuzzy match of a kept one
//! 3. **Scoring & ranking**: impact/urgency per item, sorted best first
//! 4. **Summaries**: the top N items go to the LLM (falling back on failure)
//! 5. **Output**: JSON and Markdown briefs

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dedupe;
mod errors;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod scoring;
mod scrapers;
mod summarizer;
mod utils;
mod window;

use cli::Cli;
use fetcher::{DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY, HttpFetcher, RetryFetch};
use models::Brief;
use outputs::{json, markdown};
use summarizer::{OpenAiSummarizer, Prompts};
use utils::ensure_writable_dir;
use window::CoverageWindow;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("intel_brief starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.sources, ?args.profile, ?args.output_dir, "Parsed CLI arguments");

    // ---- Configuration (fatal on any error) ----
    let profile = config::load_profile(&args.profile)?;
    let sources = config::load_sources(&args.sources)?;
    let timezone = profile.timezone()?;
    let prompts = Prompts::load(args.prompts_dir.as_deref().map(Path::new))?;

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Collect, dedupe, score, rank ----
    let window = CoverageWindow::new(profile.meta.coverage_days, timezone);
    let http = HttpFetcher::new(Duration::from_secs(args.timeout_secs))?;
    let fetcher = RetryFetch::new(http, DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY);
    let concurrency = usize::from(args.concurrency);

    let ranked = pipeline::collect_items(
        &sources,
        &window,
        &profile.scoring,
        &fetcher,
        concurrency,
    )
    .await;

    // ---- Summaries for the top of the ranking ----
    let summarizer = OpenAiSummarizer::new(
        &args.llm_base_url,
        &args.model,
        args.openai_api_key.clone(),
        prompts,
    )?;
    if args.openai_api_key.is_none() {
        info!("No API key configured; summaries will use the fallback text");
    }
    let items = summarizer::enrich_top(ranked, args.top_n, &summarizer, concurrency).await;

    // ---- Build brief ----
    let (coverage_start, coverage_end) = window.bounds();
    let brief = Brief {
        brief_date: Local::now().date_naive().to_string(),
        audience: profile.meta.audience.clone(),
        org_priorities: profile.meta.org_priorities.clone(),
        timezone: profile.meta.timezone.clone(),
        coverage_days: profile.meta.coverage_days,
        coverage_start,
        coverage_end,
        items,
    };
    info!(
        brief_date = %brief.brief_date,
        coverage_start = %brief.coverage_start,
        coverage_end = %brief.coverage_end,
        items = brief.items.len(),
        "Brief assembled"
    );

    // ---- Outputs ----
    json::write_brief(&brief, &args.output_dir).await?;
    markdown::write_markdown(&brief, &args.output_dir).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
