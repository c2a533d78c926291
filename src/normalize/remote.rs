//! Client for the remote text-correction service.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the cleaning service.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("response parse error: {0}")]
    Parse(String),
}

/// Structured response from the cleaning service.
#[derive(Debug, Clone)]
pub struct RemoteCleaning {
    pub cleaned_text: String,
    pub corrections: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CleanRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CleanResponse {
    #[serde(default)]
    cleaned_text: String,
    /// The service historically called these "improvements".
    #[serde(default, alias = "improvements")]
    corrections: Vec<String>,
}

/// HTTP client for the `/text/clean` endpoint.
pub struct CleaningClient {
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl CleaningClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        }
    }

    /// Submit text for correction under the configured deadline.
    pub async fn clean(&self, text: &str) -> Result<RemoteCleaning, CleanError> {
        let url = format!("{}/text/clean", self.endpoint);

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&CleanRequest { text })
            .send()
            .await
            .map_err(|e| CleanError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CleanError::Api(format!("HTTP {}", resp.status())));
        }

        let body: CleanResponse = resp
            .json()
            .await
            .map_err(|e| CleanError::Parse(e.to_string()))?;

        if body.cleaned_text.is_empty() {
            return Err(CleanError::Parse("empty cleaned_text in response".to_string()));
        }

        Ok(RemoteCleaning {
            cleaned_text: body.cleaned_text,
            corrections: body.corrections,
        })
    }
}
