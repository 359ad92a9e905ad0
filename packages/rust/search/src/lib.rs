//! Entity lookup against the organic-results search provider.
//!
//! Each call issues exactly one search request and reduces the response to a
//! single link: the first organic result, in provider order. Failures never
//! propagate to the caller; they degrade to the [`LOOKUP_ERROR`] or
//! [`NO_RESULT`] sentinel so the enrichment loop can keep going.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use searchagent_shared::{
    LOOKUP_ERROR, NO_RESULT, Result, SearchAgentError, SearchConfig, require_env,
};

/// Default timeout in seconds for a search request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("SearchAgent/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// HTTP client for the search provider.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SearchClient {
    /// Build a client from config. Fails if the API key env var is unset.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = require_env(&config.api_key_env, "Search")?;
        Self::new(&config.endpoint, api_key)
    }

    /// Build a client for an explicit endpoint and key.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchAgentError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Resolve `query` to a single link, degrading failures to sentinels.
    ///
    /// - first organic result's `link` on success
    /// - [`NO_RESULT`] when the provider returned no usable result
    /// - [`LOOKUP_ERROR`] on a non-success status or transport failure
    #[instrument(skip_all, fields(query = %query))]
    pub async fn lookup(&self, query: &str) -> String {
        match self.first_link(query).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                debug!("search returned no organic results");
                NO_RESULT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "search lookup failed");
                LOOKUP_ERROR.to_string()
            }
        }
    }

    /// Issue the search request and return the first organic link, if any.
    async fn first_link(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SearchAgentError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchAgentError::Network(format!(
                "HTTP {status}: unable to fetch results. Details: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchAgentError::parse(format!("invalid search response: {e}")))?;

        Ok(first_organic_link(parsed))
    }
}

/// Provider order is the only ranking: take the first result, no filtering.
fn first_organic_link(response: SearchResponse) -> Option<String> {
    response
        .organic_results
        .into_iter()
        .next()
        .and_then(|r| r.link)
        .filter(|link| !link.is_empty())
}
