//! Data models for the docintel pipeline.

mod document;

pub use document::{
    Document, DocumentSource, Page, ProcessingMethod, ProcessingResult, ProcessingState,
    StructuredData,
};
