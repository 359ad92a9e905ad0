//! Text-generation client used to summarize lookup results.
//!
//! Every call sends the input as the single part of a single content block.
//! The outcome is always a string: the first candidate's first text part,
//! [`NO_SUMMARY`] when the response carries no text, or an `Error: ...`
//! string describing the failure. Callers store whichever they get.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use searchagent_shared::{GenerationConfig, NO_SUMMARY, Result, SearchAgentError};

use crate::auth::BearerToken;

/// Generation requests can be slow; allow more time than plain lookups.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`, if present and non-empty.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// GenerativeClient
// ---------------------------------------------------------------------------

/// Client for the `generateContent` endpoint of one model.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    client: Client,
    url: String,
    token: BearerToken,
}

impl GenerativeClient {
    pub fn from_config(config: &GenerationConfig, token: BearerToken) -> Result<Self> {
        Self::new(&config.endpoint, &config.model, token)
    }

    /// `endpoint` is the API base (e.g. `.../v1beta`); the model path is appended.
    pub fn new(endpoint: &str, model: &str, token: BearerToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchAgentError::Network(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/models/{model}:generateContent",
            endpoint.trim_end_matches('/')
        );

        Ok(Self { client, url, token })
    }

    /// Summarize `text`, degrading every failure to a descriptive string.
    #[instrument(skip_all, fields(input_len = text.len()))]
    pub async fn summarize(&self, text: &str) -> String {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text }],
            }],
        };

        let response = match self
            .client
            .post(&self.url)
            .bearer_auth(self.token.as_str())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "generation request failed");
                return format!("Error: request failed. Details: {e}");
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generation returned an error status");
            return format!("Error: {}. Details: {body}", status.as_u16());
        }

        let parsed: GenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "generation response did not match the expected shape");
                GenerateResponse::default()
            }
        };

        parsed.first_text().unwrap_or_else(|| NO_SUMMARY.to_string())
    }
}
