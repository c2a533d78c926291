//! Poppler-backed implementation of `PdfTools`.
//!
//! All invocations are argument-array subprocess calls (no shell) with a
//! uniform per-call deadline. Page images land in a private temp directory
//! that is removed when the call returns, success or failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;

use super::{PdfTools, RasterError};

/// Poppler subprocess wrapper.
pub struct PopplerTools {
    /// Deadline applied to each individual tool invocation.
    timeout: Duration,
}

impl PopplerTools {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check which required binaries are present.
    pub fn check_tools() -> Vec<(&'static str, bool)> {
        ["pdftotext", "pdftoppm", "pdfinfo"]
            .iter()
            .map(|tool| (*tool, which::which(tool).is_ok()))
            .collect()
    }

    /// Write PDF bytes to a private temp file for the tools to read.
    fn spool(&self, pdf: &[u8]) -> Result<(TempDir, PathBuf), RasterError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, pdf)?;
        Ok((dir, path))
    }

    /// Run one tool under the deadline and return its output.
    async fn run(
        &self,
        tool: &'static str,
        command: &mut Command,
    ) -> Result<std::process::Output, RasterError> {
        let fut = command.kill_on_drop(true).output();
        match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => Err(RasterError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RasterError::ToolMissing(tool.to_string()))
            }
            Ok(Err(e)) => Err(RasterError::Io(e)),
            Ok(Ok(output)) => Ok(output),
        }
    }

    /// Find the image pdftoppm generated for a page.
    ///
    /// pdftoppm pads page numbers to the document's width: page-1.png,
    /// page-01.png, page-001.png.
    fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
        for digits in [1, 2, 3, 4] {
            let filename = format!("page-{:0width$}.png", page, width = digits);
            let path = dir.join(&filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}

impl Default for PopplerTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PdfTools for PopplerTools {
    async fn page_count(&self, pdf: &[u8]) -> Result<u32, RasterError> {
        let (_dir, path) = self.spool(pdf)?;

        let output = self
            .run("pdfinfo", Command::new("pdfinfo").arg(&path))
            .await?;
        if !output.status.success() {
            return Err(RasterError::Malformed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if line.starts_with("Pages:") {
                if let Some(count) = line.split_whitespace().nth(1).and_then(|s| s.parse().ok()) {
                    return Ok(count);
                }
            }
        }
        Err(RasterError::Malformed(
            "pdfinfo output contained no page count".to_string(),
        ))
    }

    async fn extract_text(&self, pdf: &[u8]) -> Result<String, RasterError> {
        let (_dir, path) = self.spool(pdf)?;

        let output = self
            .run(
                "pdftotext",
                Command::new("pdftotext")
                    .args(["-layout", "-enc", "UTF-8"])
                    .arg(&path)
                    .arg("-"), // Output to stdout
            )
            .await?;

        if !output.status.success() {
            return Err(RasterError::Malformed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn rasterize_page(
        &self,
        pdf: &[u8],
        page: u32,
        dpi: u32,
    ) -> Result<Vec<u8>, RasterError> {
        let (dir, path) = self.spool(pdf)?;
        let output_prefix = dir.path().join("page");
        let page_str = page.to_string();

        let output = self
            .run(
                "pdftoppm",
                Command::new("pdftoppm")
                    .args(["-png", "-r", &dpi.to_string()])
                    .args(["-f", &page_str, "-l", &page_str])
                    .arg(&path)
                    .arg(&output_prefix),
            )
            .await?;

        if !output.status.success() {
            return Err(RasterError::Malformed(format!(
                "pdftoppm failed on page {}: {}",
                page,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let image_path = Self::find_page_image(dir.path(), page).ok_or_else(|| {
            RasterError::Malformed(format!("no image generated for page {}", page))
        })?;

        let bytes = std::fs::read(&image_path)?;
        tracing::debug!(page, bytes = bytes.len(), "rasterized page");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools_reports_all() {
        let tools = PopplerTools::check_tools();
        assert_eq!(tools.len(), 3);
        assert!(tools.iter().any(|(name, _)| *name == "pdftoppm"));
    }

    #[test]
    fn test_find_page_image_handles_padding() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("page-007.png"), b"png").unwrap();
        let found = PopplerTools::find_page_image(dir.path(), 7).unwrap();
        assert!(found.ends_with("page-007.png"));
        assert!(PopplerTools::find_page_image(dir.path(), 8).is_none());
    }
}
