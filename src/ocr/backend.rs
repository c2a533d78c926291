//! OCR backend abstraction.
//!
//! Every recognition engine sits behind the same `OcrBackend` trait so the
//! fallback chain can treat a remote microservice, a local binary, and the
//! last-resort simulated responder uniformly. Adapters take image bytes and
//! a language hint and report text with a confidence on the 0-100 scale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognition language hint.
///
/// Vietnamese is the primary target; English is the secondary fallback when
/// a language pack is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "vie")]
    Vietnamese,
    #[serde(rename = "eng")]
    English,
}

impl Language {
    /// Tesseract-style three-letter language code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vietnamese => "vie",
            Self::English => "eng",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "vie" | "vi" | "vietnamese" => Some(Self::Vietnamese),
            "eng" | "en" | "english" => Some(Self::English),
            _ => None,
        }
    }
}

/// Available OCR engine adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendKind {
    /// Remote Vietnamese OCR microservice over HTTP.
    Remote,
    /// Local Tesseract binary.
    Tesseract,
    /// Synthetic placeholder used when no real engine is reachable.
    Simulated,
}

impl OcrBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Tesseract => "tesseract",
            Self::Simulated => "simulated",
        }
    }
}

/// Errors from a single adapter invocation.
///
/// None of these are terminal for the document: the fallback chain converts
/// them into attempt records and moves on to the next engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("engine timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid image input: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One recognized text region with its bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    pub confidence: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Output of one adapter invocation.
///
/// Owned by the fallback chain call that produced it; never persisted.
#[derive(Debug, Clone)]
pub struct EngineResult {
    /// Recognized text.
    pub text: String,
    /// Confidence on the 0-100 scale (engine-native scores are normalized).
    pub confidence: f32,
    /// Which engine produced this result.
    pub backend: OcrBackendKind,
    /// Wall-clock duration of the invocation in milliseconds.
    pub duration_ms: u64,
    /// Per-region boxes when the engine reports them; empty otherwise.
    pub regions: Vec<TextRegion>,
}

impl EngineResult {
    /// Non-whitespace character count, the unit all text-length thresholds
    /// are measured in.
    pub fn text_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// A recognition engine.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Which adapter this is.
    fn kind(&self) -> OcrBackendKind;

    /// Placeholder engines produce synthetic output and are only consulted
    /// when no real engine yielded any text.
    fn is_placeholder(&self) -> bool {
        false
    }

    /// Best-effort availability probe, used for diagnostics (`docintel
    /// tools`), not gating: the chain learns about unavailability by trying.
    async fn check_available(&self) -> bool {
        true
    }

    /// Human-readable availability explanation for operators.
    fn availability_hint(&self) -> String {
        format!("{} backend", self.kind().as_str())
    }

    /// Recognize text in one page image.
    async fn recognize(&self, image: &[u8], language: Language) -> Result<EngineResult, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::Vietnamese.code(), "vie");
        assert_eq!(Language::from_code("eng"), Some(Language::English));
        assert_eq!(Language::from_code("vi"), Some(Language::Vietnamese));
        assert_eq!(Language::from_code("fra"), None);
    }

    #[test]
    fn test_text_chars_ignores_whitespace() {
        let result = EngineResult {
            text: "a b\nc\t ".to_string(),
            confidence: 50.0,
            backend: OcrBackendKind::Tesseract,
            duration_ms: 1,
            regions: Vec::new(),
        };
        assert_eq!(result.text_chars(), 3);
    }
}
