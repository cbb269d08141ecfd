//! Command-line interface definitions for Intel Brief.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Model settings can also come from environment variables.

use crate::fetcher::DEFAULT_TIMEOUT;
use crate::summarizer::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use clap::Parser;

/// Command-line arguments for the Intel Brief application.
///
/// # Examples
///
/// ```sh
/// # Defaults: config/ for inputs, output/ for the brief
/// intel_brief
///
/// # Custom catalog, three sequential sources at a time, top 5 only
/// intel_brief -s ./my_sources.yaml --concurrency 3 --top-n 5
///
/// # Self-hosted OpenAI-compatible endpoint
/// OPENAI_API_KEY=sk-local intel_brief --llm-base-url http://localhost:8080/v1 --model qwen2.5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source catalog (category -> list of sources)
    #[arg(short, long, default_value = "config/sources.yaml")]
    pub sources: String,

    /// Brief profile (audience, coverage window, scoring weights)
    #[arg(short, long, default_value = "config/profile.yaml")]
    pub profile: String,

    /// Directory the JSON and Markdown briefs are written to
    #[arg(short, long, default_value = "output")]
    pub output_dir: String,

    /// Number of ranked items to summarize and include in the brief
    #[arg(short = 'n', long, default_value_t = 10)]
    pub top_n: usize,

    /// Sources fetched (and items summarized) at the same time; 1 is sequential
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Directory holding summarize_system.txt and summarize_user.txt
    #[arg(long)]
    pub prompts_dir: Option<String>,

    /// Chat model used for summaries
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub llm_base_url: String,

    /// API key; without one every item gets the fallback summary
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}
