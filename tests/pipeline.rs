//! End-to-end pipeline tests with stub engines and stub PDF tooling.
//!
//! The engine chain and PDF tools are injected, so these tests exercise the
//! real strategy selection, page concurrency, merge and normalization logic
//! without any external binaries or services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use docintel::config::PipelineConfig;
use docintel::models::{Document, ProcessingMethod};
use docintel::normalize::TextNormalizer;
use docintel::ocr::{
    AcceptancePolicy, ChainEngine, EngineResult, FallbackChain, Language, OcrBackend,
    OcrBackendKind, OcrError,
};
use docintel::pdf::{PdfTools, RasterError};
use docintel::pipeline::{DocumentProcessor, ProcessingError};

/// Stub PDF tooling with a scripted structural text and a rasterization
/// call counter.
struct StubPdf {
    structural_text: String,
    pages: u32,
    raster_calls: Arc<AtomicUsize>,
}

impl StubPdf {
    fn new(structural_text: &str, pages: u32) -> (Arc<Self>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let stub = Arc::new(Self {
            structural_text: structural_text.to_string(),
            pages,
            raster_calls: counter.clone(),
        });
        (stub, counter)
    }
}

#[async_trait]
impl PdfTools for StubPdf {
    async fn page_count(&self, _pdf: &[u8]) -> Result<u32, RasterError> {
        Ok(self.pages)
    }

    async fn extract_text(&self, _pdf: &[u8]) -> Result<String, RasterError> {
        Ok(self.structural_text.clone())
    }

    async fn rasterize_page(
        &self,
        _pdf: &[u8],
        page: u32,
        _dpi: u32,
    ) -> Result<Vec<u8>, RasterError> {
        self.raster_calls.fetch_add(1, Ordering::SeqCst);
        // Not a decodable image: the preprocessor passes it through and the
        // stub engines key their behavior off the marker.
        Ok(format!("raster-page-{}", page).into_bytes())
    }
}

/// Stub engine echoing page markers with optional per-page latency.
struct EchoEngine {
    kind: OcrBackendKind,
    confidence: f32,
    /// (page marker, delay) pairs; unmatched inputs respond immediately.
    latencies: Vec<(String, Duration)>,
    calls: Arc<AtomicUsize>,
}

impl EchoEngine {
    fn new(kind: OcrBackendKind, confidence: f32) -> Arc<Self> {
        Arc::new(Self {
            kind,
            confidence,
            latencies: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn with_latencies(
        kind: OcrBackendKind,
        confidence: f32,
        latencies: Vec<(String, Duration)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            confidence,
            latencies,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl OcrBackend for EchoEngine {
    fn kind(&self) -> OcrBackendKind {
        self.kind
    }

    async fn recognize(&self, image: &[u8], _language: Language) -> Result<EngineResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let marker = String::from_utf8_lossy(image).to_string();
        for (key, delay) in &self.latencies {
            if marker.contains(key.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        Ok(EngineResult {
            text: format!("recognized text of {}", marker),
            confidence: self.confidence,
            backend: self.kind,
            duration_ms: 0,
            regions: Vec::new(),
        })
    }
}

/// Stub engine that always errors.
struct DeadEngine;

#[async_trait]
impl OcrBackend for DeadEngine {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Remote
    }

    async fn recognize(
        &self,
        _image: &[u8],
        _language: Language,
    ) -> Result<EngineResult, OcrError> {
        Err(OcrError::EngineUnavailable("stub outage".to_string()))
    }
}

/// Stub placeholder engine.
struct FakeSimulated;

#[async_trait]
impl OcrBackend for FakeSimulated {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Simulated
    }

    fn is_placeholder(&self) -> bool {
        true
    }

    async fn recognize(
        &self,
        _image: &[u8],
        _language: Language,
    ) -> Result<EngineResult, OcrError> {
        Ok(EngineResult {
            text: "synthetic placeholder text for operators".to_string(),
            confidence: 30.0,
            backend: OcrBackendKind::Simulated,
            duration_ms: 0,
            regions: Vec::new(),
        })
    }
}

fn chain_of(engines: Vec<Arc<dyn OcrBackend>>) -> FallbackChain {
    FallbackChain::new(
        engines
            .into_iter()
            .map(|b| ChainEngine::new(b, Duration::from_secs(5)))
            .collect(),
        AcceptancePolicy {
            accept_confidence: 60.0,
            min_text_chars: 10,
        },
    )
}

fn processor(
    pdf: Arc<dyn PdfTools>,
    engines: Vec<Arc<dyn OcrBackend>>,
) -> DocumentProcessor {
    DocumentProcessor::new(PipelineConfig::default())
        .with_pdf_tools(pdf)
        .with_chain(chain_of(engines))
        .with_normalizer(TextNormalizer::offline())
}

fn pdf_document() -> Document {
    Document::from_bytes(b"%PDF-1.4 stub".to_vec(), "application/pdf")
}

fn png_document() -> Document {
    // Valid PNG magic so MIME verification keeps the image family.
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"not really image data");
    Document::from_bytes(bytes, "image/png")
}

fn structural_text(chars: usize) -> String {
    "Van ban hanh chinh so 123/QD-UBND "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}

#[tokio::test]
async fn sufficient_structural_text_skips_rasterization() {
    let (pdf, raster_calls) = StubPdf::new(&structural_text(150), 3);
    let engine = EchoEngine::new(OcrBackendKind::Tesseract, 80.0);
    let processor = processor(pdf, vec![engine.clone()]);

    let result = processor.process(&pdf_document()).await.unwrap();

    assert_eq!(result.processing_method, ProcessingMethod::TextExtraction);
    assert_eq!(result.page_count, 3);
    assert_eq!(raster_calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!((result.confidence - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn image_input_always_runs_ocr() {
    let (pdf, _) = StubPdf::new("", 1);
    let engine = EchoEngine::new(OcrBackendKind::Tesseract, 80.0);
    let processor = processor(pdf, vec![engine.clone()]);

    let result = processor.process(&png_document()).await.unwrap();

    assert_eq!(result.processing_method, ProcessingMethod::Ocr);
    assert_eq!(result.page_count, 1);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert!((result.confidence - 0.80).abs() < 1e-6);
}

#[tokio::test]
async fn processing_is_idempotent_for_structured_data() {
    let (pdf, _) = StubPdf::new("", 1);
    let engine = EchoEngine::new(OcrBackendKind::Tesseract, 80.0);
    let processor = processor(pdf, vec![engine]);

    let document = png_document();
    let first = processor.process(&document).await.unwrap();
    let second = processor.process(&document).await.unwrap();

    assert_eq!(first.structured_data, second.structured_data);
    assert_eq!(first.extracted_text, second.extracted_text);
}

#[tokio::test]
async fn partial_structural_text_produces_hybrid_merge() {
    // 25 non-whitespace chars: above the 20-char hybrid floor, below the
    // 100-char sufficiency threshold.
    let labels = "HOSOLUUTRU-BIEUMAU-TRANG-123";
    assert!(labels.len() > 20 && labels.len() < 100);
    let (pdf, raster_calls) = StubPdf::new(labels, 1);
    let engine = EchoEngine::new(OcrBackendKind::Tesseract, 70.0);
    let processor = processor(pdf, vec![engine]);

    let result = processor.process(&pdf_document()).await.unwrap();

    assert_eq!(result.processing_method, ProcessingMethod::Hybrid);
    assert_eq!(raster_calls.load(Ordering::SeqCst), 1);
    // Both text sources survive the merge.
    assert!(result.extracted_text.contains(labels));
    assert!(result.extracted_text.contains("recognized text of"));
    // Hybrid confidence is the max of both paths.
    assert!((result.confidence - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn total_engine_failure_is_a_hard_error() {
    let (pdf, _) = StubPdf::new("", 2);
    let processor = processor(pdf, vec![Arc::new(DeadEngine), Arc::new(DeadEngine)]);

    let err = processor.process(&pdf_document()).await.err().unwrap();

    match err {
        ProcessingError::NoTextExtracted(summary) => {
            assert!(summary.contains("page 1"));
            assert!(summary.contains("page 2"));
            assert!(summary.contains("stub outage"));
        }
        other => panic!("expected NoTextExtracted, got {:?}", other),
    }
}

#[tokio::test]
async fn merged_text_follows_page_order_not_completion_order() {
    let (pdf, _) = StubPdf::new("", 3);
    // Page 1 is the slowest, page 2 the fastest.
    let engine = EchoEngine::with_latencies(
        OcrBackendKind::Tesseract,
        80.0,
        vec![
            ("raster-page-1".to_string(), Duration::from_millis(120)),
            ("raster-page-3".to_string(), Duration::from_millis(40)),
        ],
    );
    let processor = processor(pdf, vec![engine]);

    let result = processor.process(&pdf_document()).await.unwrap();

    let p1 = result.extracted_text.find("raster-page-1").unwrap();
    let p2 = result.extracted_text.find("raster-page-2").unwrap();
    let p3 = result.extracted_text.find("raster-page-3").unwrap();
    assert!(p1 < p2 && p2 < p3);
    assert_eq!(result.page_count, 3);
}

#[tokio::test]
async fn placeholder_use_is_recorded_in_metadata() {
    let (pdf, _) = StubPdf::new("", 1);
    let processor = processor(pdf, vec![Arc::new(DeadEngine), Arc::new(FakeSimulated)]);

    let result = processor.process(&pdf_document()).await.unwrap();

    assert_eq!(result.metadata["placeholderUsed"], serde_json::json!(true));
    assert!((result.confidence - 0.30).abs() < 1e-6);
    assert!(result.extracted_text.contains("synthetic placeholder"));
}

#[tokio::test]
async fn unsupported_mime_is_rejected() {
    let (pdf, _) = StubPdf::new("", 1);
    let engine = EchoEngine::new(OcrBackendKind::Tesseract, 80.0);
    let processor = processor(pdf, vec![engine]);

    let document = Document::from_bytes(b"hello world".to_vec(), "text/plain");
    let err = processor.process(&document).await.err().unwrap();
    assert!(matches!(err, ProcessingError::UnsupportedMime(_)));
}

#[tokio::test]
async fn truncated_remote_cleaning_falls_back_to_local() {
    // Minimal HTTP stub returning a cleaned_text 5% the size of the input.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = vec![0u8; 65536];
                let mut read = 0;
                // Read until the end of headers; the body length check is
                // not needed for this stub's purposes.
                while read < buf.len() {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let body = r#"{"cleaned_text":"xxxxx","corrections":["truncated everything"]}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    let config = docintel::config::CleaningServiceConfig {
        endpoint: Some(format!("http://{}", addr)),
        timeout_secs: 5,
        min_length_ratio: 0.2,
    };
    let normalizer = TextNormalizer::new(&config);

    let input = "Ngay sinh: 01-01-1990 ".repeat(10);
    let result = normalizer.normalize(&input).await;

    assert_eq!(
        result.source,
        docintel::normalize::NormalizationSource::Local
    );
    assert!(result.degraded);
    // Local cleaner ran: date separators were normalized.
    assert!(result.text.contains("01/01/1990"));
}
