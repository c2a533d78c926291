//! Simulated OCR backend.
//!
//! Last-resort responder used only when no real engine produced any text.
//! Its output is synthetic and clearly tagged: results carry the
//! `simulated` backend kind, a fixed low confidence, and a banner line in
//! the text itself, so a placeholder can never masquerade as a real
//! recognition run downstream.

use std::time::Instant;

use async_trait::async_trait;

use super::backend::{EngineResult, Language, OcrBackend, OcrBackendKind, OcrError};

/// Fixed confidence reported for synthetic output. Deliberately below the
/// acceptance threshold so a placeholder result is only ever selected as the
/// best remaining attempt, never as an acceptable one.
pub const SIMULATED_CONFIDENCE: f32 = 30.0;

const VIETNAMESE_SAMPLE: &str = "\
CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM
Độc lập - Tự do - Hạnh phúc

CĂN CƯỚC CÔNG DÂN

Số: 001234567890
Họ và tên: NGUYỄN VĂN A
Ngày sinh: 01/01/1990
Giới tính: Nam
Quốc tịch: Việt Nam
Quê quán: Hà Nội, Việt Nam
Nơi thường trú: 123 Đường ABC, Phường XYZ, Quận DEF, Hà Nội

[SIMULATED OUTPUT - no OCR engine was reachable]";

const ENGLISH_SAMPLE: &str = "\
SOCIALIST REPUBLIC OF VIET NAM
Independence - Freedom - Happiness

CITIZEN IDENTITY CARD

No: 001234567890
Full name: NGUYEN VAN A
Date of birth: 01/01/1990

[SIMULATED OUTPUT - no OCR engine was reachable]";

/// Simulated OCR backend.
pub struct SimulatedBackend;

impl SimulatedBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for SimulatedBackend {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Simulated
    }

    fn is_placeholder(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        "Simulated responder (always available, synthetic output)".to_string()
    }

    async fn recognize(&self, _image: &[u8], language: Language) -> Result<EngineResult, OcrError> {
        let start = Instant::now();
        tracing::warn!("no real OCR engine produced text; emitting simulated output");

        let text = match language {
            Language::Vietnamese => VIETNAMESE_SAMPLE,
            Language::English => ENGLISH_SAMPLE,
        };

        Ok(EngineResult {
            text: text.to_string(),
            confidence: SIMULATED_CONFIDENCE,
            backend: OcrBackendKind::Simulated,
            duration_ms: start.elapsed().as_millis() as u64,
            regions: Vec::new(),
        })
    }
}
