//! Language-model summaries for the top-ranked items.
//!
//! # Architecture
//!
//! - [`Summarizer`]: async "summarize this item" trait
//! - [`OpenAiSummarizer`]: OpenAI-compatible chat completions client
//! - [`summarize_or_fallback`]: never fails; re-asks once on a cut-off
//!   response and otherwise degrades to [`SummaryRecord::fallback`]
//! - [`enrich_top`]: summarizes the first `n` ranked items with bounded
//!   concurrency, keeping rank order
//!
//! The model must answer with `{headline, summary, exec_action, tags}` JSON,
//! optionally inside a ```` ```json ```` fence.

use crate::config::read_file;
use crate::errors::{ConfigError, SummarizerError};
use crate::fetcher::USER_AGENT;
use crate::models::{CandidateItem, SummaryRecord};
use crate::utils::{looks_truncated, truncate_for_log};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/summarize_system.txt");
const DEFAULT_USER_PROMPT: &str = include_str!("../prompts/summarize_user.txt");

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(title|date|source|url|snippet)\}").expect("valid placeholder regex")
});

/// What the model is told about one item.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub title: String,
    pub date: String,
    pub source: String,
    pub link: String,
    pub snippet: String,
}

impl From<&CandidateItem> for SummaryRequest {
    fn from(item: &CandidateItem) -> Self {
        Self {
            title: item.title.clone(),
            date: item.date.clone(),
            source: item.source.clone(),
            link: item.link.clone(),
            snippet: item.snippet.clone(),
        }
    }
}

/// Produce a structured summary for one item.
pub trait Summarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryRecord, SummarizerError>;
}

/// System prompt and user prompt template.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    /// Read `summarize_system.txt` and `summarize_user.txt` from `dir`.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let read = |name: &str| read_file(&dir.join(name).to_string_lossy());
        let prompts = Self {
            system: read("summarize_system.txt")?,
            user: read("summarize_user.txt")?,
        };
        info!("Loaded prompt templates");
        Ok(prompts)
    }

    /// Built-in prompts unless a directory is given.
    pub fn load(dir: Option<&Path>) -> Result<Self, ConfigError> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Ok(Self::default()),
        }
    }

    /// Fill the user template. Substituted values are never re-scanned, so a
    /// title containing `{url}` stays as written.
    pub fn render_user(&self, request: &SummaryRequest) -> String {
        PLACEHOLDER
            .replace_all(&self.user, |caps: &Captures| match &caps[1] {
                "title" => request.title.clone(),
                "date" => request.date.clone(),
                "source" => request.source.clone(),
                "url" => request.link.clone(),
                _ => request.snippet.clone(),
            })
            .into_owned()
    }
}

/// Pull the JSON object out of a model reply and validate it.
///
/// Tags are trimmed, emptied entries dropped and duplicates removed.
pub fn parse_record(content: &str) -> Result<SummaryRecord, SummarizerError> {
    let body = strip_code_fence(content);
    match serde_json::from_str::<SummaryRecord>(body) {
        Ok(mut record) => {
            record.tags = record
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unique()
                .collect();
            Ok(record)
        }
        Err(e) if looks_truncated(&e) => Err(SummarizerError::Truncated(e.to_string())),
        Err(e) => Err(SummarizerError::Malformed(format!(
            "{e}; response: {}",
            truncate_for_log(body, 300)
        ))),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiSummarizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompts: Prompts,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSummarizer {
    /// Without an API key every call reports [`SummarizerError::Unavailable`].
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        prompts: Prompts,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            prompts,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Summarizer for OpenAiSummarizer {
    #[instrument(level = "debug", skip_all, fields(title = %request.title))]
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryRecord, SummarizerError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SummarizerError::Unavailable("no API key configured".into()));
        };

        let user = self.prompts.render_user(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.prompts.system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: TEMPERATURE,
        };

        let t0 = Instant::now();
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizerError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SummarizerError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| SummarizerError::Malformed(e.to_string()))?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), "Model responded");

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SummarizerError::Malformed("response has no message content".into()))?;

        parse_record(&content)
    }
}

/// Summarize one item; always yields a record.
pub async fn summarize_or_fallback<S: Summarizer>(
    summarizer: &S,
    request: &SummaryRequest,
) -> SummaryRecord {
    let first = match summarizer.summarize(request).await {
        Err(SummarizerError::Truncated(e)) => {
            warn!(title = %request.title, error = %e, "Response cut off; re-asking once");
            summarizer.summarize(request).await
        }
        other => other,
    };

    match first {
        Ok(record) => record,
        Err(e) => {
            warn!(title = %request.title, error = %e, "Summarizer failed; using fallback");
            SummaryRecord::fallback()
        }
    }
}

/// Keep the first `top_n` ranked items and attach a summary to each.
#[instrument(level = "info", skip_all, fields(top_n = top_n, concurrency = concurrency))]
pub async fn enrich_top<S: Summarizer>(
    mut items: Vec<CandidateItem>,
    top_n: usize,
    summarizer: &S,
    concurrency: usize,
) -> Vec<CandidateItem> {
    items.truncate(top_n);

    let records: Vec<SummaryRecord> = stream::iter(items.iter())
        .map(|item| async move { summarize_or_fallback(summarizer, &SummaryRequest::from(item)).await })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for (item, record) in items.iter_mut().zip(records) {
        item.apply_summary(record);
    }
    info!(count = items.len(), "Summarized top items");
    items
}
