//! Tesseract OCR backend implementation.
//!
//! Runs the Tesseract binary on a temp copy of the page image and parses its
//! TSV output for word-level confidences. This is the always-available local
//! engine; the Vietnamese language pack (`vie.traineddata`) is expected to be
//! installed, with English as the automatic fallback when it is not.

use std::io::Write;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{EngineResult, Language, OcrBackend, OcrBackendKind, OcrError, TextRegion};

/// Tesseract OCR backend.
pub struct TesseractBackend {
    /// Page segmentation mode. 6 = assume a uniform block of text, the mode
    /// that works best for scanned administrative forms.
    psm: u8,
    /// OCR engine mode. 3 = default LSTM + legacy combined.
    oem: u8,
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self { psm: 6, oem: 3 }
    }

    #[allow(dead_code)]
    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    /// Run tesseract in TSV mode and collect raw output.
    async fn run_tesseract(
        &self,
        image_path: &std::path::Path,
        lang: Language,
    ) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", lang.code()])
            .args(["--oem", &self.oem.to_string()])
            .args(["--psm", &self.psm.to_string()])
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                // Missing language pack: retry once with English rather than
                // failing the whole adapter.
                if lang != Language::English && stderr.contains("Failed loading language") {
                    tracing::warn!(
                        "tesseract language pack '{}' missing, retrying with eng",
                        lang.code()
                    );
                    return Box::pin(self.run_tesseract(image_path, Language::English)).await;
                }
                Err(OcrError::RecognitionFailed(format!(
                    "tesseract failed: {}",
                    stderr
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::EngineUnavailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed TSV output: reassembled text, average word confidence, regions.
fn parse_tsv(tsv: &str) -> (String, f32, Vec<TextRegion>) {
    let mut text = String::new();
    let mut confidences: Vec<f32> = Vec::new();
    let mut regions = Vec::new();
    let mut current_line: Option<(u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        // Word rows are level 5; higher levels are layout containers.
        if cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);

        let line_key = (
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        match current_line {
            Some(prev) if prev == line_key => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line_key);
        text.push_str(word);

        if conf >= 0.0 {
            confidences.push(conf);
            regions.push(TextRegion {
                text: word.to_string(),
                confidence: conf,
                x: cols[6].parse().unwrap_or(0),
                y: cols[7].parse().unwrap_or(0),
                width: cols[8].parse().unwrap_or(0),
                height: cols[9].parse().unwrap_or(0),
            });
        }
    }

    let avg_confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    (text, avg_confidence, regions)
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn kind(&self) -> OcrBackendKind {
        OcrBackendKind::Tesseract
    }

    async fn check_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }

    fn availability_hint(&self) -> String {
        if which::which("tesseract").is_err() {
            "Tesseract not installed. Install with: apt install tesseract-ocr tesseract-ocr-vie"
                .to_string()
        } else {
            "Tesseract is available".to_string()
        }
    }

    async fn recognize(&self, image: &[u8], language: Language) -> Result<EngineResult, OcrError> {
        let start = Instant::now();

        // Tesseract reads from disk; give it a private temp copy that is
        // removed when this call returns, success or failure.
        let mut temp = tempfile::Builder::new()
            .prefix("docintel-page-")
            .suffix(".png")
            .tempfile()?;
        temp.write_all(image)?;
        temp.flush()?;

        let tsv = self.run_tesseract(temp.path(), language).await?;
        let (text, confidence, regions) = parse_tsv(&tsv);

        Ok(EngineResult {
            text,
            confidence,
            backend: OcrBackendKind::Tesseract,
            duration_ms: start.elapsed().as_millis() as u64,
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_words_and_confidence() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
             5\t1\t1\t1\t1\t1\t0\t0\t20\t10\t91\tHọ\n\
             5\t1\t1\t1\t1\t2\t22\t0\t20\t10\t85\tvà\n\
             5\t1\t1\t1\t2\t1\t0\t12\t20\t10\t78\ttên",
            HEADER
        );
        let (text, conf, regions) = parse_tsv(&tsv);
        assert_eq!(text, "Họ và\ntên");
        assert!((conf - (91.0 + 85.0 + 78.0) / 3.0).abs() < 0.01);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[2].y, 12);
    }

    #[test]
    fn test_parse_tsv_empty_output() {
        let (text, conf, regions) = parse_tsv(HEADER);
        assert!(text.is_empty());
        assert_eq!(conf, 0.0);
        assert!(regions.is_empty());
    }

    #[test]
    fn test_parse_tsv_skips_negative_confidence_words() {
        let tsv = format!("{}\n5\t1\t1\t1\t1\t1\t0\t0\t20\t10\t-1\tnoise", HEADER);
        let (text, conf, _) = parse_tsv(&tsv);
        // The word is kept in the text but excluded from the average.
        assert_eq!(text, "noise");
        assert_eq!(conf, 0.0);
    }
}
