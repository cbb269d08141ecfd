//! Error types for every stage of a brief run.
//!
//! Only [`ConfigError`] is fatal. Fetch and parse failures are scoped to a
//! single source and summarizer failures to a single item; the callers log
//! them and carry on.

use std::io;
use thiserror::Error;

/// Network failure while retrieving a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Every attempt failed; carries the error from the final attempt.
    #[error("{url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: usize,
        #[source]
        last: Box<FetchError>,
    },
}

/// Content that could not be turned into items or instants.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed feed: {0}")]
    Feed(String),

    #[error("unrecognised feed root element <{0}>")]
    UnknownFeedFormat(String),

    #[error("unparseable date {0:?}")]
    Date(String),
}

/// Why a single source contributed nothing to the run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure at the language-model boundary. Always recovered with
/// [`crate::models::SummaryRecord::fallback`].
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarizer returned HTTP {0}")]
    Status(u16),

    #[error("summarizer response was cut off: {0}")]
    Truncated(String),

    #[error("summarizer response did not match the expected shape: {0}")]
    Malformed(String),
}

/// Configuration that makes a run impossible.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no sources configured")]
    NoSources,

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("coverage window must be zero or more days, got {0}")]
    InvalidWindow(i64),
}
