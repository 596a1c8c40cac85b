//! random.org strings API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Upper bound for the retry backoff.
const MAX_BACKOFF_MS: u64 = 5000;

/// Error type for random string sources.
#[derive(Debug, thiserror::Error)]
pub enum RandomOrgError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// random.org answered with a non-success status.
    #[error("random.org error: {status} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// A remote supplier of random strings.
///
/// An empty batch means the supplier has nothing to give (e.g. quota
/// exhausted); it is not an error.
#[async_trait]
pub trait RandomSource: Send + Sync {
    /// Fetch up to `count` strings of `length` characters.
    async fn fetch(&self, count: usize, length: usize) -> Result<Vec<String>, RandomOrgError>;
}

/// random.org client with exponential backoff.
#[derive(Debug, Clone)]
pub struct RandomOrgClient {
    client: Client,
    url: String,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl RandomOrgClient {
    /// Create a client for the strings endpoint at `url`.
    ///
    /// Defaults to 3 retries starting at 200ms.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RandomOrgError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            max_retries: 3,
            initial_backoff_ms: 200,
        })
    }

    /// Override the retry policy. The initial backoff is capped like every
    /// later one.
    #[must_use]
    pub const fn with_retry(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = if initial_backoff_ms > MAX_BACKOFF_MS {
            MAX_BACKOFF_MS
        } else {
            initial_backoff_ms
        };
        self
    }

    async fn fetch_once(&self, count: usize, length: usize) -> Result<Vec<String>, RandomOrgError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("num", count.to_string().as_str()),
                ("len", length.to_string().as_str()),
                ("digits", "on"),
                ("upperalpha", "on"),
                ("loweralpha", "on"),
                ("unique", "on"),
                ("format", "plain"),
                ("rnd", "new"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RandomOrgError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

#[async_trait]
impl RandomSource for RandomOrgClient {
    async fn fetch(&self, count: usize, length: usize) -> Result<Vec<String>, RandomOrgError> {
        let mut attempt = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            match self.fetch_once(count, length).await {
                Ok(strings) => return Ok(strings),
                Err(e) => {
                    if attempt >= self.max_retries {
                        tracing::warn!(
                            attempt = attempt + 1,
                            error = %e,
                            "random.org request failed after max retries"
                        );
                        return Err(e);
                    }
                    attempt += 1;

                    tracing::debug!(
                        attempt = attempt,
                        backoff_ms = backoff_ms,
                        error = %e,
                        "random.org request failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = next_backoff(backoff_ms);
                }
            }
        }
    }
}

/// Double `backoff_ms`, capped at [`MAX_BACKOFF_MS`].
const fn next_backoff(backoff_ms: u64) -> u64 {
    let doubled = backoff_ms.saturating_mul(2);
    if doubled > MAX_BACKOFF_MS {
        MAX_BACKOFF_MS
    } else {
        doubled
    }
}
