//! PDF structural extraction and page rasterization.
//!
//! Both operations shell out to Poppler (`pdftotext`, `pdfinfo`,
//! `pdftoppm`) and are isolated behind the `PdfTools` trait: rasterization
//! depends on an external rendering utility and can fail independently of
//! OCR, and the pipeline is tested against stub implementations with call
//! counters.

mod poppler;

pub use poppler::PopplerTools;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from PDF tooling.
///
/// "Tool unavailable" and "malformed input" are deliberately distinct:
/// operators fix the first by installing poppler-utils, the second by
/// looking at the uploaded file.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("PDF tool not found: {0} (install poppler-utils)")]
    ToolMissing(String),

    #[error("malformed or unreadable PDF: {0}")]
    Malformed(String),

    #[error("PDF tool timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// PDF operations the pipeline needs.
#[async_trait]
pub trait PdfTools: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, pdf: &[u8]) -> Result<u32, RasterError>;

    /// Structural text extraction: pull text straight from the PDF's text
    /// objects, no rendering and no recognition.
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, RasterError>;

    /// Render one page (1-based) to a PNG at the given resolution.
    async fn rasterize_page(&self, pdf: &[u8], page: u32, dpi: u32)
        -> Result<Vec<u8>, RasterError>;
}
