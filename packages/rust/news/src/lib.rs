//! Related-news fetcher with fixed-backoff retry on rate limiting.
//!
//! The news provider signals rate limiting with a dedicated status code
//! (426 by default). Those responses are retried after a fixed pause, up to a
//! bounded number of attempts; every other failure is reported immediately.
//! See [`retry`] for the state machine driving the loop.

pub mod retry;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use searchagent_shared::{NewsConfig, NewsItem, SearchAgentError};

use crate::retry::AttemptOutcome;

pub use retry::FetchState;

/// Default timeout in seconds for a single news request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for news requests.
const USER_AGENT: &str = concat!("SearchAgent/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a news fetch produced no items.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NewsError {
    /// No API key configured; checked before any request is sent.
    #[error("API key not found. Please ensure the news API key is set in your environment.")]
    MissingCredential,

    /// The provider answered successfully with zero articles.
    #[error("No news found for your query.")]
    NoResults,

    /// Non-success status other than the rate-limit signal. Not retried.
    #[error("Error fetching news: {status}")]
    Status { status: u16 },

    /// Every attempt was rate limited.
    #[error("Failed to fetch news after {attempts} attempts.")]
    RetryExhausted { attempts: u32 },

    /// Transport or decoding failure. Not retried.
    #[error("Error fetching news: {0}")]
    Network(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<Article> for NewsItem {
    fn from(article: Article) -> Self {
        Self {
            title: article.title.unwrap_or_default(),
            description: article.description.unwrap_or_default(),
            url: article.url.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Request parameters and retry policy for [`NewsClient`].
#[derive(Debug, Clone)]
pub struct NewsOptions {
    pub endpoint: String,
    pub page_size: u32,
    pub sort_by: String,
    pub language: String,
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub rate_limit_status: u16,
    /// Fixed pause before each retry.
    pub backoff: Duration,
}

impl From<&NewsConfig> for NewsOptions {
    fn from(config: &NewsConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            page_size: config.page_size,
            sort_by: config.sort_by.clone(),
            language: config.language.clone(),
            max_attempts: config.max_attempts,
            rate_limit_status: config.rate_limit_status,
            backoff: config.backoff(),
        }
    }
}

impl Default for NewsOptions {
    fn default() -> Self {
        Self::from(&NewsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// NewsClient
// ---------------------------------------------------------------------------

/// HTTP client for the news provider.
#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    api_key: Option<String>,
    options: NewsOptions,
}

impl NewsClient {
    /// Build a client from config. A missing key is not an error here; it
    /// surfaces as [`NewsError::MissingCredential`] on the first fetch.
    pub fn from_config(config: &NewsConfig) -> searchagent_shared::Result<Self> {
        Self::new(config.api_key(), NewsOptions::from(config))
    }

    pub fn new(
        api_key: Option<String>,
        options: NewsOptions,
    ) -> searchagent_shared::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchAgentError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            options,
        })
    }

    /// Fetch articles related to `query`, in provider order.
    ///
    /// Blocks the calling task for `backoff` between rate-limited attempts.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn fetch(&self, query: &str) -> Result<Vec<NewsItem>, NewsError> {
        let api_key = self.api_key.as_deref().ok_or(NewsError::MissingCredential)?;
        let max_attempts = self.options.max_attempts.max(1);

        let mut state = FetchState::Attempting(1);
        loop {
            state = match state {
                FetchState::Attempting(attempt) => {
                    debug!(attempt, max_attempts, "requesting news");
                    let outcome = self.attempt(query, api_key).await?;
                    FetchState::after_attempt(attempt, outcome, max_attempts)
                }
                FetchState::Backoff(attempt) => {
                    warn!(
                        attempt,
                        backoff_ms = self.options.backoff.as_millis() as u64,
                        "news provider rate limited, backing off"
                    );
                    tokio::time::sleep(self.options.backoff).await;
                    FetchState::Attempting(attempt + 1)
                }
                FetchState::Success(items) => {
                    if items.is_empty() {
                        return Err(NewsError::NoResults);
                    }
                    info!(articles = items.len(), "news fetched");
                    return Ok(items);
                }
                FetchState::PermanentFailure(status) => {
                    warn!(status, "news request failed");
                    return Err(NewsError::Status { status });
                }
                FetchState::Exhausted(attempts) => {
                    warn!(attempts, "news retries exhausted");
                    return Err(NewsError::RetryExhausted { attempts });
                }
            };
        }
    }

    /// One HTTP round trip, classified for the state machine.
    async fn attempt(&self, query: &str, api_key: &str) -> Result<AttemptOutcome, NewsError> {
        let page_size = self.options.page_size.to_string();
        let response = self
            .client
            .get(&self.options.endpoint)
            .query(&[
                ("q", query),
                ("apiKey", api_key),
                ("pageSize", page_size.as_str()),
                ("sortBy", self.options.sort_by.as_str()),
                ("language", self.options.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NewsError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == self.options.rate_limit_status {
            return Ok(AttemptOutcome::RateLimited);
        }
        if !status.is_success() {
            return Ok(AttemptOutcome::Status(status.as_u16()));
        }

        let parsed: NewsResponse = response
            .json()
            .await
            .map_err(|e| NewsError::Network(format!("invalid news response: {e}")))?;

        Ok(AttemptOutcome::Articles(
            parsed.articles.into_iter().map(NewsItem::from).collect(),
        ))
    }
}
