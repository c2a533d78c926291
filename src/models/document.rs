//! Document models for the processing pipeline.
//!
//! A `Document` is the immutable input descriptor created by the surrounding
//! upload/storage layer; the pipeline only reads it. `ProcessingResult` is
//! the pipeline's final artifact, serialized for the caller.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where the document bytes come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// File on disk, read lazily.
    Path(PathBuf),
    /// In-memory buffer (uploads that were never spooled to disk).
    Buffer(Vec<u8>),
}

/// Immutable input descriptor for one processing run.
///
/// Content is identified by SHA-256 hash, enabling idempotence checks by the
/// caller when the same upload is submitted twice.
#[derive(Debug, Clone)]
pub struct Document {
    /// Unique identifier for this document.
    pub id: String,
    /// SHA-256 hash of the document content.
    pub content_hash: String,
    /// Byte source (path or buffer).
    pub source: DocumentSource,
    /// Declared MIME type from the upload.
    pub mime_type: String,
    /// Original filename, if known.
    pub original_filename: Option<String>,
}

impl Document {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Create a document from an in-memory buffer.
    pub fn from_bytes(content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_hash: Self::compute_hash(&content),
            source: DocumentSource::Buffer(content),
            mime_type: mime_type.into(),
            original_filename: None,
        }
    }

    /// Create a document from a file on disk.
    ///
    /// Reads the file once to compute the content hash; the bytes themselves
    /// are re-read at processing time from the path.
    pub fn from_path(
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let content = std::fs::read(&path)?;
        let original_filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_hash: Self::compute_hash(&content),
            source: DocumentSource::Path(path),
            mime_type: mime_type.into(),
            original_filename,
        })
    }

    /// Set the identifier (caller-assigned IDs take precedence over UUIDs).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the original filename.
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.original_filename = Some(name.into());
        self
    }

    /// Read the document bytes.
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            DocumentSource::Path(path) => std::fs::read(path),
            DocumentSource::Buffer(bytes) => Ok(bytes.clone()),
        }
    }
}

/// One rasterized unit of a document.
///
/// For PDFs this is produced by the rasterizer; single images are their own
/// page 1. Raster bytes live only for the page's OCR attempt chain.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Pixel width, 0 when the raster header could not be read.
    pub width: u32,
    /// Pixel height, 0 when the raster header could not be read.
    pub height: u32,
    /// Raw raster bytes (PNG).
    pub image: Vec<u8>,
    /// Enhanced raster bytes, if preprocessing ran.
    pub preprocessed: Option<Vec<u8>>,
}

impl Page {
    pub fn new(number: u32, image: Vec<u8>) -> Self {
        // Dimensions come from the image header only; no full decode.
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(&image))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .unwrap_or((0, 0));
        Self {
            number,
            width,
            height,
            image,
            preprocessed: None,
        }
    }

    /// The bytes OCR should consume: preprocessed when available.
    pub fn ocr_input(&self) -> &[u8] {
        self.preprocessed.as_deref().unwrap_or(&self.image)
    }
}

/// Which strategy path produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMethod {
    /// Structural PDF text extraction, no recognition involved.
    #[serde(rename = "text-extraction")]
    TextExtraction,
    /// OCR over rasterized pages.
    #[serde(rename = "ocr")]
    Ocr,
    /// Structural text and OCR output merged.
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextExtraction => "text-extraction",
            Self::Ocr => "ocr",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Pipeline state, recorded per transition for latency accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Rasterizing,
    Extracting,
    Normalizing,
    Structuring,
    Completed,
    Failed,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rasterizing => "rasterizing",
            Self::Extracting => "extracting",
            Self::Normalizing => "normalizing",
            Self::Structuring => "structuring",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Structured fields extracted from cleaned text.
///
/// Unmatched fields are simply absent; absence is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    /// Classified document type identifier.
    pub document_type: String,
    /// Extracted field name → value pairs.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl StructuredData {
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// The pipeline's final, externally visible artifact.
///
/// Serialized with the exact key names the surrounding REST layer exposes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Full extracted (and cleaned) text.
    pub extracted_text: String,
    /// Confidence on the 0.0–1.0 scale, provenance-aware: fixed high for
    /// structural extraction, engine-measured for OCR, max of both for
    /// hybrid.
    pub confidence: f32,
    /// Number of pages processed (>= 1).
    pub page_count: u32,
    /// Which strategy path was taken.
    pub processing_method: ProcessingMethod,
    /// Document-type tagged field map.
    pub structured_data: StructuredData,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Diagnostics: engines attempted, placeholder use, normalization source,
    /// detected MIME, per-state latencies.
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash() {
        let hash = Document::compute_hash(b"Hello, World!");
        assert_eq!(hash.len(), 64); // SHA-256 produces 64 hex chars
    }

    #[test]
    fn test_page_ocr_input_prefers_preprocessed() {
        let mut page = Page::new(1, vec![1, 2, 3]);
        assert_eq!(page.ocr_input(), &[1, 2, 3]);
        page.preprocessed = Some(vec![4, 5]);
        assert_eq!(page.ocr_input(), &[4, 5]);
    }

    #[test]
    fn test_page_dimensions_from_header() {
        use image::{GrayImage, Luma};
        let mut buf = Vec::new();
        let img = GrayImage::from_pixel(24, 18, Luma([128u8]));
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let page = Page::new(1, buf);
        assert_eq!((page.width, page.height), (24, 18));
    }

    #[test]
    fn test_page_dimensions_zero_for_opaque_bytes() {
        let page = Page::new(1, vec![1, 2, 3]);
        assert_eq!((page.width, page.height), (0, 0));
    }

    #[test]
    fn test_processing_method_serialization() {
        let json = serde_json::to_string(&ProcessingMethod::TextExtraction).unwrap();
        assert_eq!(json, "\"text-extraction\"");
        let json = serde_json::to_string(&ProcessingMethod::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ProcessingResult {
            extracted_text: "abc".to_string(),
            confidence: 0.95,
            page_count: 1,
            processing_method: ProcessingMethod::Ocr,
            structured_data: StructuredData::new("unclassified"),
            processing_time_ms: 12,
            metadata: serde_json::json!({}),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("extractedText").is_some());
        assert!(value.get("pageCount").is_some());
        assert!(value.get("processingMethod").is_some());
        assert_eq!(
            value["structuredData"]["documentType"],
            serde_json::json!("unclassified")
        );
    }
}
