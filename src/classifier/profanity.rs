// Remote profanity-filter client.
//
// Sends the text as a `text` query parameter with an `X-Api-Key` header and
// reads a boolean `has_profanity` from the JSON body. Every request is bounded
// by the client-wide timeout. Any failure (transport error, timeout, non-200
// status, unparseable body) degrades to "no external signal" so the engine
// falls back to lexical-only decisions.
//
// API docs: https://api-ninjas.com/api/profanityfilter

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::traits::{ExternalResult, SignalSource};
use crate::output::truncate_chars;

pub const DEFAULT_CLASSIFIER_URL: &str = "https://api.api-ninjas.com/v1/profanityfilter";

/// Upper bound on a single classification call, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the profanity-filter API.
pub struct ProfanityClient {
    client: Client,
    url: String,
    api_key: String,
}

impl ProfanityClient {
    /// Create a client for `url` that gives up on any request after `timeout`.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sieve/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// One request/response round trip. Errors are converted to
    /// `ExternalResult::unavailable()` by the SignalSource impl.
    async fn request(&self, text: &str) -> Result<bool> {
        let response = self
            .client
            .get(&self.url)
            .header("X-Api-Key", &self.api_key)
            .query(&[("text", text)])
            .send()
            .await
            .context("Profanity API request failed")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Profanity API returned {}: {}", status, body);
        }

        let body: ProfanityResponse = response
            .json()
            .await
            .context("Failed to parse Profanity API response")?;

        Ok(body.has_profanity)
    }
}

#[async_trait]
impl SignalSource for ProfanityClient {
    async fn classify(&self, text: &str) -> ExternalResult {
        match self.request(text).await {
            Ok(has_profanity) => {
                debug!(
                    has_profanity,
                    text_preview = %truncate_chars(text, 50),
                    "Classified text"
                );
                ExternalResult::signal(has_profanity)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "External classifier unavailable, falling back to local check");
                ExternalResult::unavailable()
            }
        }
    }
}

/// Response body of the profanity-filter endpoint.
///
/// Only `has_profanity` is required; the echo fields are optional because
/// not every deployment returns them.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfanityResponse {
    pub has_profanity: bool,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub censored: Option<String>,
}
