//! OCR fallback chain.
//!
//! Tries an ordered list of engine adapters until one produces an acceptable
//! result. Ordering runs from most-accurate-but-most-fragile to
//! least-accurate-but-always-available; an engine that errors or times out
//! is an expected degraded path, recorded and skipped, never a terminal
//! failure. Only a run where no engine yields any text at all is fatal for
//! the page.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use super::backend::{EngineResult, Language, OcrBackend, OcrBackendKind};

/// When a result is accepted outright.
#[derive(Debug, Clone, Copy)]
pub struct AcceptancePolicy {
    /// Minimum confidence (0-100).
    pub accept_confidence: f32,
    /// Minimum non-whitespace characters. Guards against engines reporting
    /// high confidence on near-empty output.
    pub min_text_chars: usize,
}

impl AcceptancePolicy {
    fn accepts(&self, result: &EngineResult) -> bool {
        result.confidence >= self.accept_confidence && result.text_chars() >= self.min_text_chars
    }
}

/// One engine slot: the adapter plus its private deadline.
pub struct ChainEngine {
    pub backend: Arc<dyn OcrBackend>,
    pub timeout: Duration,
}

impl ChainEngine {
    pub fn new(backend: Arc<dyn OcrBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

/// What happened when one engine was consulted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Met the acceptance policy; the chain stopped here.
    Accepted { confidence: f32, chars: usize },
    /// Produced text but failed the policy; retained as a candidate.
    BelowThreshold { confidence: f32, chars: usize },
    /// Produced no usable text.
    Empty,
    /// Placeholder engine not consulted because a real engine already
    /// produced text.
    Skipped,
    /// Deadline expired; the invocation was aborted.
    TimedOut,
    /// The adapter returned an error (unreachable service, missing binary,
    /// non-zero exit).
    Failed { error: String },
}

/// Diagnostic record of one engine consultation.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackAttempt {
    pub engine: OcrBackendKind,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
}

impl FallbackAttempt {
    /// One-line description for operator-facing error messages.
    pub fn describe(&self) -> String {
        let detail = match &self.outcome {
            AttemptOutcome::Accepted { confidence, chars } => {
                format!("accepted ({:.1}% conf, {} chars)", confidence, chars)
            }
            AttemptOutcome::BelowThreshold { confidence, chars } => {
                format!("below threshold ({:.1}% conf, {} chars)", confidence, chars)
            }
            AttemptOutcome::Empty => "no text".to_string(),
            AttemptOutcome::Skipped => "skipped (real text already present)".to_string(),
            AttemptOutcome::TimedOut => "timed out".to_string(),
            AttemptOutcome::Failed { error } => format!("failed: {}", error),
        };
        format!("{}: {}", self.engine.as_str(), detail)
    }
}

/// Result of a full chain run over one page.
pub struct ChainOutcome {
    /// The selected engine result.
    pub result: EngineResult,
    /// Whether the result met the acceptance policy (as opposed to being the
    /// best remaining attempt after exhaustion).
    pub accepted: bool,
    /// Every consultation, in order.
    pub attempts: Vec<FallbackAttempt>,
}

/// Chain-level errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Every engine was exhausted without producing any non-empty text.
    #[error("no engine produced text for this page; attempts: {summary}")]
    NoTextExtracted { summary: String },
}

/// Ordered engine adapters with a shared acceptance policy.
///
/// The engine list is read-only configuration and the chain is safe to share
/// across concurrently processed pages.
pub struct FallbackChain {
    engines: Vec<ChainEngine>,
    policy: AcceptancePolicy,
}

impl FallbackChain {
    pub fn new(engines: Vec<ChainEngine>, policy: AcceptancePolicy) -> Self {
        Self { engines, policy }
    }

    pub fn policy(&self) -> AcceptancePolicy {
        self.policy
    }

    /// Run the chain over one preprocessed page image.
    ///
    /// Returns the first result meeting the acceptance policy, or the
    /// best-scoring non-empty attempt once every engine has been consulted.
    pub async fn recognize(
        &self,
        image: &[u8],
        language: Language,
    ) -> Result<ChainOutcome, ChainError> {
        let mut attempts: Vec<FallbackAttempt> = Vec::with_capacity(self.engines.len());
        let mut best: Option<EngineResult> = None;

        for engine in &self.engines {
            let kind = engine.backend.kind();

            if engine.backend.is_placeholder() && best.is_some() {
                attempts.push(FallbackAttempt {
                    engine: kind,
                    outcome: AttemptOutcome::Skipped,
                    duration_ms: 0,
                });
                continue;
            }

            let start = Instant::now();
            let outcome =
                tokio::time::timeout(engine.timeout, engine.backend.recognize(image, language))
                    .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Err(_) => {
                    tracing::warn!(engine = kind.as_str(), "OCR engine timed out");
                    attempts.push(FallbackAttempt {
                        engine: kind,
                        outcome: AttemptOutcome::TimedOut,
                        duration_ms,
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(engine = kind.as_str(), error = %e, "OCR engine failed");
                    attempts.push(FallbackAttempt {
                        engine: kind,
                        outcome: AttemptOutcome::Failed {
                            error: e.to_string(),
                        },
                        duration_ms,
                    });
                }
                Ok(Ok(result)) => {
                    let chars = result.text_chars();
                    if chars == 0 {
                        attempts.push(FallbackAttempt {
                            engine: kind,
                            outcome: AttemptOutcome::Empty,
                            duration_ms,
                        });
                        continue;
                    }

                    if self.policy.accepts(&result) {
                        attempts.push(FallbackAttempt {
                            engine: kind,
                            outcome: AttemptOutcome::Accepted {
                                confidence: result.confidence,
                                chars,
                            },
                            duration_ms,
                        });
                        tracing::debug!(
                            engine = kind.as_str(),
                            confidence = result.confidence,
                            "OCR result accepted"
                        );
                        return Ok(ChainOutcome {
                            result,
                            accepted: true,
                            attempts,
                        });
                    }

                    attempts.push(FallbackAttempt {
                        engine: kind,
                        outcome: AttemptOutcome::BelowThreshold {
                            confidence: result.confidence,
                            chars,
                        },
                        duration_ms,
                    });
                    // Keep the highest-scoring candidate; ties go to the
                    // earlier (more accurate) engine.
                    if best
                        .as_ref()
                        .map_or(true, |b| result.confidence > b.confidence)
                    {
                        best = Some(result);
                    }
                }
            }
        }

        match best {
            Some(result) => {
                tracing::debug!(
                    engine = result.backend.as_str(),
                    confidence = result.confidence,
                    "chain exhausted, using best attempt"
                );
                Ok(ChainOutcome {
                    result,
                    accepted: false,
                    attempts,
                })
            }
            None => Err(ChainError::NoTextExtracted {
                summary: attempts
                    .iter()
                    .map(FallbackAttempt::describe)
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }
}
