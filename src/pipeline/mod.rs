//! Processing orchestrator.
//!
//! Composes the strategy selector, rasterizer, preprocessor, OCR fallback
//! chain, normalizer and field extractor into a single
//! `process(document) -> ProcessingResult` call. The orchestrator walks a
//! linear state machine (`pending → rasterizing → extracting → normalizing →
//! structuring → completed`), records every transition for latency
//! accounting, and degrades gracefully: only a document where no page yields
//! any text becomes a hard error.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::PipelineConfig;
use crate::extract::extract_fields;
use crate::models::{Document, Page, ProcessingMethod, ProcessingResult, ProcessingState};
use crate::normalize::TextNormalizer;
use crate::ocr::{
    AcceptancePolicy, ChainEngine, ChainError, ChainOutcome, FallbackChain, OcrBackend,
    OcrBackendKind, RemoteOcrBackend, SimulatedBackend, TesseractBackend,
};
use crate::pdf::{PdfTools, PopplerTools, RasterError};
use crate::preprocess::Preprocessor;
use crate::utils::mime::{input_kind, verify_mime, InputKind};

/// Terminal pipeline errors.
///
/// Callers receive either a well-formed `ProcessingResult` or exactly one of
/// these - never a partial state.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("unsupported MIME type: {0}")]
    UnsupportedMime(String),

    #[error("rasterization failed: {0}")]
    Rasterization(#[from] RasterError),

    #[error("no text could be extracted from any page; {0}")]
    NoTextExtracted(String),

    #[error("could not read document bytes: {0}")]
    Io(#[from] std::io::Error),
}

/// Recorded state transitions with wall-clock and monotonic timestamps.
struct StateLog {
    entries: Vec<(ProcessingState, DateTime<Utc>, Instant)>,
}

impl StateLog {
    fn new() -> Self {
        let mut log = Self {
            entries: Vec::with_capacity(8),
        };
        log.enter(ProcessingState::Pending);
        log
    }

    fn enter(&mut self, state: ProcessingState) {
        tracing::debug!(state = state.as_str(), "pipeline state transition");
        self.entries.push((state, Utc::now(), Instant::now()));
    }

    /// Per-state dwell times in milliseconds.
    fn to_json(&self) -> serde_json::Value {
        let mut states = Vec::with_capacity(self.entries.len());
        for (i, (state, at, instant)) in self.entries.iter().enumerate() {
            let dwell_ms = match self.entries.get(i + 1) {
                Some((_, _, next)) => next.duration_since(*instant).as_millis() as u64,
                None => instant.elapsed().as_millis() as u64,
            };
            states.push(serde_json::json!({
                "state": state.as_str(),
                "at": at.to_rfc3339(),
                "durationMs": dwell_ms,
            }));
        }
        serde_json::Value::Array(states)
    }
}

/// Outcome of one page's extraction attempt chain.
struct PageOutcome {
    number: u32,
    /// Whether OCR consumed the enhanced image or the raw raster.
    preprocessed: bool,
    outcome: Result<ChainOutcome, ChainError>,
}

/// Top-level document processor.
pub struct DocumentProcessor {
    config: PipelineConfig,
    pdf: Arc<dyn PdfTools>,
    preprocessor: Preprocessor,
    chain: Arc<FallbackChain>,
    normalizer: TextNormalizer,
}

impl DocumentProcessor {
    /// Build a processor with the real engine stack described by the config.
    pub fn new(config: PipelineConfig) -> Self {
        let chain = Self::build_chain(&config);
        let normalizer = TextNormalizer::new(&config.cleaning);
        let preprocessor = Preprocessor::new(config.binarize);
        Self {
            config,
            pdf: Arc::new(PopplerTools::new()),
            preprocessor,
            chain: Arc::new(chain),
            normalizer,
        }
    }

    fn build_chain(config: &PipelineConfig) -> FallbackChain {
        let engines = config
            .chain
            .engines
            .iter()
            .map(|entry| {
                let backend: Arc<dyn OcrBackend> = match entry.kind {
                    OcrBackendKind::Remote => Arc::new(RemoteOcrBackend::new(
                        config.ocr_service.endpoint.clone(),
                        config.chain.accept_confidence,
                    )),
                    OcrBackendKind::Tesseract => Arc::new(TesseractBackend::new()),
                    OcrBackendKind::Simulated => Arc::new(SimulatedBackend::new()),
                };
                ChainEngine::new(backend, entry.timeout())
            })
            .collect();

        FallbackChain::new(
            engines,
            AcceptancePolicy {
                accept_confidence: config.chain.accept_confidence,
                min_text_chars: config.chain.min_text_chars,
            },
        )
    }

    /// Replace the PDF tooling (stubbed in tests).
    pub fn with_pdf_tools(mut self, pdf: Arc<dyn PdfTools>) -> Self {
        self.pdf = pdf;
        self
    }

    /// Replace the fallback chain (stub engines in tests).
    pub fn with_chain(mut self, chain: FallbackChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    /// Replace the normalizer.
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document to completion.
    pub async fn process(&self, document: &Document) -> Result<ProcessingResult, ProcessingError> {
        let started = Instant::now();
        let mut log = StateLog::new();

        let bytes = document.read_bytes()?;
        let mime = verify_mime(&bytes, &document.mime_type);
        tracing::info!(
            document = document.id.as_str(),
            mime = mime.as_str(),
            bytes = bytes.len(),
            "processing document"
        );

        let result = match input_kind(&mime) {
            InputKind::Pdf => self.process_pdf(&bytes, &mime, &mut log, started).await,
            InputKind::Image => self.process_image(&bytes, &mime, &mut log, started).await,
            InputKind::Unsupported => Err(ProcessingError::UnsupportedMime(mime.clone())),
        };

        match result {
            Ok(result) => Ok(result),
            Err(e) => {
                log.enter(ProcessingState::Failed);
                tracing::error!(document = document.id.as_str(), error = %e, "processing failed");
                Err(e)
            }
        }
    }

    /// PDF path: structural extraction first, rasterize + OCR only when the
    /// structural yield is insufficient.
    async fn process_pdf(
        &self,
        bytes: &[u8],
        mime: &str,
        log: &mut StateLog,
        started: Instant,
    ) -> Result<ProcessingResult, ProcessingError> {
        // Structural pass. Failure here is not fatal: a scanned-image PDF
        // still has the OCR path ahead of it.
        let structural_text = match self.pdf.extract_text(bytes).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "structural text extraction failed, continuing to OCR");
                String::new()
            }
        };
        let structural_chars = non_ws_chars(&structural_text);
        let page_count = self.pdf.page_count(bytes).await.unwrap_or(1).max(1);

        if structural_chars >= self.config.min_structural_chars {
            // Text PDF: no recognition uncertainty, no rasterization.
            tracing::info!(structural_chars, "structural extraction sufficient, skipping OCR");
            return self
                .finalize(
                    structural_text,
                    self.config.text_extraction_confidence,
                    page_count,
                    ProcessingMethod::TextExtraction,
                    serde_json::json!([]),
                    false,
                    mime,
                    log,
                    started,
                )
                .await;
        }

        // Rasterize every page up front; losing the ability to produce page
        // images is terminal.
        log.enter(ProcessingState::Rasterizing);
        let mut pages = Vec::with_capacity(page_count as usize);
        for number in 1..=page_count {
            let image = self
                .pdf
                .rasterize_page(bytes, number, self.config.dpi)
                .await?;
            pages.push(Page::new(number, image));
        }

        log.enter(ProcessingState::Extracting);
        let outcomes = self.extract_pages(pages).await;
        let merged = self.merge_pages(outcomes)?;

        // Preserve partial structural text (embedded form labels and the
        // like) that a rasterized OCR pass can miss.
        let (text, method, confidence) = if structural_chars > self.config.hybrid_floor_chars {
            let combined = format!("{}\n\n{}", structural_text.trim(), merged.text);
            let confidence = self
                .config
                .text_extraction_confidence
                .max(merged.confidence);
            (combined, ProcessingMethod::Hybrid, confidence)
        } else {
            (merged.text, ProcessingMethod::Ocr, merged.confidence)
        };

        self.finalize(
            text,
            confidence,
            page_count,
            method,
            merged.attempts,
            merged.placeholder_used,
            mime,
            log,
            started,
        )
        .await
    }

    /// Image path: the file is its own single page; OCR always runs.
    async fn process_image(
        &self,
        bytes: &[u8],
        mime: &str,
        log: &mut StateLog,
        started: Instant,
    ) -> Result<ProcessingResult, ProcessingError> {
        log.enter(ProcessingState::Extracting);
        let outcomes = self.extract_pages(vec![Page::new(1, bytes.to_vec())]).await;
        let merged = self.merge_pages(outcomes)?;

        self.finalize(
            merged.text,
            merged.confidence,
            1,
            ProcessingMethod::Ocr,
            merged.attempts,
            merged.placeholder_used,
            mime,
            log,
            started,
        )
        .await
    }

    /// Run preprocess → fallback chain for every page concurrently, bounded
    /// by the worker limit. Results come back tagged with their page number;
    /// completion order is irrelevant.
    async fn extract_pages(&self, pages: Vec<Page>) -> Vec<PageOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let language = self.config.language;

        let mut handles = Vec::with_capacity(pages.len());
        for mut page in pages {
            let semaphore = semaphore.clone();
            let chain = self.chain.clone();
            let preprocessor = self.preprocessor;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");

                // CPU-only enhancement; never fails, never suspends.
                page.preprocessed = Some(preprocessor.enhance(&page.image));

                let outcome = chain.recognize(page.ocr_input(), language).await;
                PageOutcome {
                    number: page.number,
                    preprocessed: page.preprocessed.is_some(),
                    outcome,
                }
                // Page buffers drop here, once the attempt chain is done.
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "page task panicked"),
            }
        }
        // Output order matches page order, not completion order.
        outcomes.sort_by_key(|o| o.number);
        outcomes
    }

    /// Merge per-page outcomes in page order. Partial failure is tolerated;
    /// total failure escalates.
    fn merge_pages(&self, outcomes: Vec<PageOutcome>) -> Result<MergedPages, ProcessingError> {
        let mut texts: Vec<String> = Vec::new();
        let mut confidences: Vec<f32> = Vec::new();
        let mut placeholder_used = false;
        let mut attempt_records = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        for outcome in &outcomes {
            match &outcome.outcome {
                Ok(chain_outcome) => {
                    let result = &chain_outcome.result;
                    texts.push(result.text.trim().to_string());
                    confidences.push(result.confidence);
                    placeholder_used |= result.backend == OcrBackendKind::Simulated;
                    attempt_records.push(serde_json::json!({
                        "page": outcome.number,
                        "imageVariant": if outcome.preprocessed { "preprocessed" } else { "raw" },
                        "selectedEngine": result.backend.as_str(),
                        "accepted": chain_outcome.accepted,
                        "confidence": result.confidence,
                        "attempts": chain_outcome.attempts,
                    }));
                }
                Err(e) => {
                    tracing::warn!(page = outcome.number, error = %e, "page extraction failed");
                    failures.push(format!("page {}: {}", outcome.number, e));
                    attempt_records.push(serde_json::json!({
                        "page": outcome.number,
                        "error": e.to_string(),
                    }));
                }
            }
        }

        if texts.is_empty() {
            return Err(ProcessingError::NoTextExtracted(failures.join("; ")));
        }

        // Confidence reflects only the pages that succeeded.
        let confidence = confidences.iter().sum::<f32>() / confidences.len() as f32;

        Ok(MergedPages {
            text: texts.join("\n\n"),
            confidence,
            placeholder_used,
            attempts: serde_json::Value::Array(attempt_records),
        })
    }

    /// Normalize, extract structured fields, and assemble the final result.
    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        text: String,
        confidence: f32,
        page_count: u32,
        method: ProcessingMethod,
        attempts: serde_json::Value,
        placeholder_used: bool,
        mime: &str,
        log: &mut StateLog,
        started: Instant,
    ) -> Result<ProcessingResult, ProcessingError> {
        log.enter(ProcessingState::Normalizing);
        let normalized = self.normalizer.normalize(&text).await;
        // A cleaner that ate the whole text degrades to the stage input.
        let final_text = if normalized.text.is_empty() && !text.is_empty() {
            tracing::warn!("normalization produced empty text, keeping raw input");
            text
        } else {
            normalized.text
        };

        log.enter(ProcessingState::Structuring);
        let structured_data = extract_fields(&final_text);

        log.enter(ProcessingState::Completed);

        let metadata = serde_json::json!({
            "mime": mime,
            "language": self.config.language.code(),
            "placeholderUsed": placeholder_used,
            "pages": attempts,
            "normalization": {
                "source": normalized.source.as_str(),
                "degraded": normalized.degraded,
                "corrections": normalized.corrections,
            },
            "states": log.to_json(),
        });

        Ok(ProcessingResult {
            extracted_text: final_text,
            confidence: (confidence / 100.0).clamp(0.0, 1.0),
            page_count,
            processing_method: method,
            structured_data,
            processing_time_ms: started.elapsed().as_millis() as u64,
            metadata,
        })
    }
}

/// Intermediate merge of per-page OCR outcomes.
struct MergedPages {
    text: String,
    confidence: f32,
    placeholder_used: bool,
    attempts: serde_json::Value,
}

fn non_ws_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
