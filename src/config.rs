//! Configuration for the processing pipeline.
//!
//! All thresholds the pipeline applies (structural sufficiency, OCR
//! acceptance, normalization safety floor) live here as configurable values
//! with fixed defaults. The engine chain is explicit configuration passed
//! into the orchestrator, never module-level state.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ocr::{Language, OcrBackendKind};

/// Default config file name, searched in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "docintel.toml";

/// One engine slot in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEntry {
    /// Which adapter to invoke.
    pub kind: OcrBackendKind,
    /// Per-engine deadline in seconds.
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

impl EngineEntry {
    pub fn new(kind: OcrBackendKind, timeout_secs: u64) -> Self {
        Self { kind, timeout_secs }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ordered engine list plus the acceptance policy for the fallback chain.
///
/// Engines are ordered from most-accurate-but-most-fragile to
/// least-accurate-but-always-available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineChainConfig {
    /// Minimum confidence (0-100) for accepting a result outright.
    #[serde(default = "default_accept_confidence")]
    pub accept_confidence: f32,
    /// Minimum number of non-whitespace characters for a result to count as
    /// text at all.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// Engines to try, in order.
    #[serde(default = "default_engines")]
    pub engines: Vec<EngineEntry>,
}

impl Default for EngineChainConfig {
    fn default() -> Self {
        Self {
            accept_confidence: default_accept_confidence(),
            min_text_chars: default_min_text_chars(),
            engines: default_engines(),
        }
    }
}

fn default_accept_confidence() -> f32 {
    60.0
}

fn default_min_text_chars() -> usize {
    10
}

fn default_engine_timeout_secs() -> u64 {
    60
}

fn default_engines() -> Vec<EngineEntry> {
    vec![
        EngineEntry::new(OcrBackendKind::Remote, 30),
        EngineEntry::new(OcrBackendKind::Tesseract, 60),
        EngineEntry::new(OcrBackendKind::Simulated, 5),
    ]
}

/// Remote OCR microservice settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrServiceConfig {
    /// Base URL of the OCR microservice.
    #[serde(default = "default_ocr_endpoint")]
    pub endpoint: String,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ocr_endpoint(),
        }
    }
}

fn default_ocr_endpoint() -> String {
    "http://localhost:8001".to_string()
}

/// Remote text-correction service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningServiceConfig {
    /// Base URL of the cleaning service. `None` disables the remote path
    /// entirely, using the offline cleaner only.
    #[serde(default = "default_clean_endpoint")]
    pub endpoint: Option<String>,
    /// Request deadline in seconds.
    #[serde(default = "default_clean_timeout_secs")]
    pub timeout_secs: u64,
    /// Remote output shorter than this fraction of the input is discarded
    /// as implausibly truncated.
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f32,
}

impl Default for CleaningServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_clean_endpoint(),
            timeout_secs: default_clean_timeout_secs(),
            min_length_ratio: default_min_length_ratio(),
        }
    }
}

fn default_clean_endpoint() -> Option<String> {
    Some("http://localhost:8001".to_string())
}

fn default_clean_timeout_secs() -> u64 {
    15
}

fn default_min_length_ratio() -> f32 {
    0.2
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Default recognition language hint.
    #[serde(default)]
    pub language: Language,
    /// Non-whitespace characters a PDF's structural text must reach before
    /// OCR is skipped.
    #[serde(default = "default_min_structural_chars")]
    pub min_structural_chars: usize,
    /// Structural text above this floor is preserved alongside OCR output
    /// (hybrid merge) even when insufficient on its own.
    #[serde(default = "default_hybrid_floor_chars")]
    pub hybrid_floor_chars: usize,
    /// Confidence (0-100) reported for pure structural extraction.
    #[serde(default = "default_text_extraction_confidence")]
    pub text_extraction_confidence: f32,
    /// Rasterization resolution.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Concurrent page workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Apply binarization in the preprocessor (low-quality scans).
    #[serde(default)]
    pub binarize: bool,
    /// Fallback chain configuration.
    #[serde(default)]
    pub chain: EngineChainConfig,
    /// Remote OCR microservice.
    #[serde(default)]
    pub ocr_service: OcrServiceConfig,
    /// Remote text-correction service.
    #[serde(default)]
    pub cleaning: CleaningServiceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            min_structural_chars: default_min_structural_chars(),
            hybrid_floor_chars: default_hybrid_floor_chars(),
            text_extraction_confidence: default_text_extraction_confidence(),
            dpi: default_dpi(),
            workers: default_workers(),
            binarize: false,
            chain: EngineChainConfig::default(),
            ocr_service: OcrServiceConfig::default(),
            cleaning: CleaningServiceConfig::default(),
        }
    }
}

fn default_min_structural_chars() -> usize {
    100
}

fn default_hybrid_floor_chars() -> usize {
    20
}

fn default_text_extraction_confidence() -> f32 {
    95.0
}

fn default_dpi() -> u32 {
    300
}

fn default_workers() -> usize {
    4
}

impl PipelineConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file is absent, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    let raw = std::fs::read_to_string(default_path)?;
                    toml::from_str(&raw)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Service endpoints can be overridden without a config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("DOCINTEL_OCR_ENDPOINT") {
            if !endpoint.is_empty() {
                self.ocr_service.endpoint = endpoint;
            }
        }
        if let Ok(endpoint) = std::env::var("DOCINTEL_CLEAN_ENDPOINT") {
            if endpoint.is_empty() {
                self.cleaning.endpoint = None;
            } else {
                self.cleaning.endpoint = Some(endpoint);
            }
        }
    }
}
