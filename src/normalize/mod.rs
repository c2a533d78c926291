//! Language-specific text normalization.
//!
//! Cleans raw OCR output before field extraction. The remote correction
//! service is tried first when configured; any failure, timeout, or
//! implausibly truncated response degrades to the deterministic local
//! cleaner. Normalization never fails the pipeline.

mod local;
mod remote;

pub use local::{CleanedText, LocalCleaner};
pub use remote::{CleanError, CleaningClient, RemoteCleaning};

use crate::config::CleaningServiceConfig;
use std::time::Duration;

/// Which path produced the cleaned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationSource {
    Remote,
    Local,
}

impl NormalizationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// Normalization output.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    /// Itemized corrections, for observability.
    pub corrections: Vec<String>,
    pub source: NormalizationSource,
    /// True when the remote path was configured but its output could not be
    /// used (unreachable, malformed, or truncated below the safety floor).
    pub degraded: bool,
}

/// Remote-first normalizer with a deterministic local fallback.
pub struct TextNormalizer {
    client: Option<CleaningClient>,
    cleaner: LocalCleaner,
    /// Remote output below this fraction of the input length is discarded.
    min_length_ratio: f32,
}

impl TextNormalizer {
    pub fn new(config: &CleaningServiceConfig) -> Self {
        let client = config
            .endpoint
            .as_ref()
            .map(|e| CleaningClient::new(e.clone(), Duration::from_secs(config.timeout_secs)));
        Self {
            client,
            cleaner: LocalCleaner::new(),
            min_length_ratio: config.min_length_ratio,
        }
    }

    /// Local-only normalizer (no remote service configured).
    pub fn offline() -> Self {
        Self {
            client: None,
            cleaner: LocalCleaner::new(),
            min_length_ratio: 0.2,
        }
    }

    /// Clean OCR text.
    pub async fn normalize(&self, text: &str) -> NormalizedText {
        if let Some(client) = &self.client {
            match client.clean(text).await {
                Ok(remote) => {
                    if self.plausible(text, &remote.cleaned_text) {
                        return NormalizedText {
                            text: remote.cleaned_text,
                            corrections: remote.corrections,
                            source: NormalizationSource::Remote,
                            degraded: false,
                        };
                    }
                    tracing::warn!(
                        input_chars = non_ws_chars(text),
                        output_chars = non_ws_chars(&remote.cleaned_text),
                        "remote cleaning output implausibly short, using local cleaner"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "remote cleaning unavailable, using local cleaner");
                }
            }
            return self.local(text, true);
        }

        self.local(text, false)
    }

    fn local(&self, text: &str, degraded: bool) -> NormalizedText {
        let cleaned = self.cleaner.clean(text);
        NormalizedText {
            text: cleaned.text,
            corrections: cleaned.corrections,
            source: NormalizationSource::Local,
            degraded,
        }
    }

    /// Safety floor: guard against a buggy remote service returning
    /// truncated output.
    fn plausible(&self, input: &str, output: &str) -> bool {
        let input_chars = non_ws_chars(input);
        if input_chars == 0 {
            return true;
        }
        let floor = (input_chars as f32 * self.min_length_ratio) as usize;
        non_ws_chars(output) >= floor
    }
}

fn non_ws_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
