//! HTTP retrieval with bounded exponential backoff.
//!
//! # Architecture
//!
//! - [`Fetch`]: async "GET this URL, give me the body" trait
//! - [`HttpFetcher`]: `reqwest` implementation with a fixed User-Agent and timeout
//! - [`RetryFetch`]: decorator that retries any [`Fetch`] implementation
//!
//! Tests substitute their own [`Fetch`] to serve canned bodies.
//!
//! # Retry Strategy
//!
//! - 3 attempts in total
//! - Backoff 1s, 2s, 4s… capped at 8s between attempts
//! - Random jitter (0-250ms) added to each wait

use crate::errors::FetchError;
use rand::{Rng, rng};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/graves/intel_brief)"
);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_ATTEMPTS: usize = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Retrieve the text body of a URL.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP GET via `reqwest`. Non-2xx responses are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client that identifies itself with [`USER_AGENT`] and gives up
    /// on a single request after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.map_err(transport)?;
        debug!(bytes = body.len(), "Fetched body");
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// The delay before attempt `n + 1` is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=jitter)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher.
    inner: T,
    /// Total attempts, including the first.
    max_attempts: usize,
    /// Wait after the first failure; doubles each time.
    base_delay: Duration,
    /// Cap on a single wait.
    max_delay: Duration,
    /// Upper bound of the random jitter added to each wait.
    jitter: Duration,
}

impl<T: Fetch> RetryFetch<T> {
    /// Wrap `inner` with `max_attempts` total attempts starting at `base_delay`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(DEFAULT_TIMEOUT)?;
    /// let fetcher = RetryFetch::new(http, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: Duration::from_millis(250),
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait after the `attempt`-th failure (1-based).
    fn backoff(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

impl<T> std::fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Fetch> Fetch for RetryFetch<T> {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt >= self.max_attempts {
                        error!(
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fails `failures` times with a 503, then returns `body`.
    struct Flaky {
        failures: usize,
        calls: Cell<usize>,
        body: &'static str,
    }

    impl Fetch for Flaky {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.failures {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                })
            } else {
                Ok(self.body.to_string())
            }
        }
    }

    fn retrying(inner: Flaky) -> RetryFetch<Flaky> {
        RetryFetch::new(inner, 3, Duration::from_millis(1)).with_jitter(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let f = retrying(Flaky {
            failures: 2,
            calls: Cell::new(0),
            body: "ok",
        });
        assert_eq!(f.fetch("https://example.com").await.unwrap(), "ok");
        assert_eq!(f.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let f = retrying(Flaky {
            failures: 10,
            calls: Cell::new(0),
            body: "never",
        });
        let err = f.fetch("https://example.com").await.unwrap_err();
        assert_eq!(f.inner.calls.get(), 3);
        match err {
            FetchError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status { status: 503, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call() {
        let f = retrying(Flaky {
            failures: 0,
            calls: Cell::new(0),
            body: "body",
        });
        assert_eq!(f.fetch("https://example.com").await.unwrap(), "body");
        assert_eq!(f.inner.calls.get(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let f = RetryFetch::new(
            Flaky {
                failures: 0,
                calls: Cell::new(0),
                body: "",
            },
            3,
            DEFAULT_BASE_DELAY,
        )
        .with_jitter(Duration::ZERO);
        assert_eq!(f.backoff(1), Duration::from_secs(1));
        assert_eq!(f.backoff(2), Duration::from_secs(2));
        assert_eq!(f.backoff(3), Duration::from_secs(4));
        assert_eq!(f.backoff(4), Duration::from_secs(8));
        assert_eq!(f.backoff(9), Duration::from_secs(8));
    }

    #[test]
    fn test_user_agent_names_the_agent() {
        assert!(USER_AGENT.starts_with("intel_brief/"));
    }
}
