//! Remote OCR microservice backend.
//!
//! Talks to the Vietnamese OCR service over HTTP: JSON request with a
//! base64-encoded page image, JSON response with text, confidence and
//! per-run metadata. The service is the most accurate engine in the chain
//! and also the most fragile - it may simply be down, which is an expected
//! degraded path, not an error the caller ever sees.

use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::backend::{EngineResult, Language, OcrBackend, OcrBackendKind, OcrError};

/// Remote OCR service backend.
pub struct RemoteOcrBackend {
    endpoint: String,
    /// Confidence threshold forwarded to the service's word filter.
    confidence_threshold: f32,
    client: Client,
}

/// Request format of the `/ocr/process` endpoint.
#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: String,
    language: &'a str,
    confidence_threshold: f32,
}

/// Response format of the `/ocr/process` endpoint.
#[derive(Debug, Deserialize)]
struct OcrResponse {
    success: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Response format of the `/health` endpoint.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl RemoteOcrBackend {
    /// Create a backend for the service at `endpoint`.
    pub fn new(endpoint: impl Into<String>, confidence_threshold: f32) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            endpoint: endpoint.into(),
            confidence_threshold,
            client,
        }
    }

    async fn health(&self) -> Result<HealthResponse, OcrError> {
        let url = format!("{}/health", self.endpoint);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(OcrError::EngineUnavailable(format!(
                "HTTP {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| OcrError::RecognitionFailed(e.to_string()))
    }
}

#[async_trait]
impl OcrBackend for RemoteOcrBackend {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Remote
    }

    async fn check_available(&self) -> bool {
        matches!(self.health().await, Ok(h) if h.status == "healthy")
    }

    fn availability_hint(&self) -> String {
        format!("Remote OCR service at {}", self.endpoint)
    }

    async fn recognize(&self, image: &[u8], language: Language) -> Result<EngineResult, OcrError> {
        let start = Instant::now();
        let url = format!("{}/ocr/process", self.endpoint);

        let request = OcrRequest {
            image: BASE64.encode(image),
            language: language.code(),
            confidence_threshold: self.confidence_threshold,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    OcrError::EngineUnavailable(format!("OCR service unreachable: {}", e))
                } else {
                    OcrError::RecognitionFailed(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(OcrError::RecognitionFailed(format!(
                "OCR service returned HTTP {}",
                resp.status()
            )));
        }

        let body: OcrResponse = resp
            .json()
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("malformed response: {}", e)))?;

        if !body.success {
            let detail = body
                .metadata
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unspecified service error");
            return Err(OcrError::RecognitionFailed(detail.to_string()));
        }

        tracing::debug!(
            confidence = body.confidence,
            chars = body.text.len(),
            "remote OCR succeeded"
        );

        Ok(EngineResult {
            text: body.text,
            confidence: body.confidence,
            backend: OcrBackendKind::Remote,
            duration_ms: start.elapsed().as_millis() as u64,
            regions: Vec::new(),
        })
    }
}
