//! OCR engines and the fallback chain.
//!
//! Text recognition runs through an ordered chain of engine adapters:
//! - a remote Vietnamese OCR microservice (most accurate, may be down)
//! - the local Tesseract binary (always installable, CPU-based)
//! - a simulated responder (synthetic output, explicitly tagged)
//!
//! Each adapter implements `OcrBackend`; `FallbackChain` owns ordering,
//! per-engine deadlines and the acceptance policy.

mod backend;
mod chain;
mod remote;
mod simulated;
mod tesseract;

pub use backend::{EngineResult, Language, OcrBackend, OcrBackendKind, OcrError, TextRegion};
pub use chain::{
    AcceptancePolicy, AttemptOutcome, ChainEngine, ChainError, ChainOutcome, FallbackAttempt,
    FallbackChain,
};
pub use remote::RemoteOcrBackend;
pub use simulated::{SimulatedBackend, SIMULATED_CONFIDENCE};
pub use tesseract::TesseractBackend;
