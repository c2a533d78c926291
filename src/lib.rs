//! docintel - multi-strategy OCR and text extraction pipeline.
//!
//! Turns scanned Vietnamese administrative documents (PDFs and images) into
//! machine-readable text plus structured fields. PDFs try cheap structural
//! text extraction first; scanned content falls through to rasterization,
//! image preprocessing, and an ordered chain of OCR engines with per-engine
//! deadlines. Whatever path wins, the text is cleaned by a language-specific
//! normalizer and pattern-matched into document-type fields.
//!
//! The design goal is graceful degradation: always return the best available
//! text with an honest confidence estimate; fail only when no strategy can
//! produce any text at all.

pub mod cli;
pub mod config;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod preprocess;
pub mod utils;

pub use config::{EngineChainConfig, PipelineConfig};
pub use models::{Document, ProcessingMethod, ProcessingResult};
pub use pipeline::{DocumentProcessor, ProcessingError};
