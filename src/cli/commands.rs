//! Command handlers.

use std::path::PathBuf;

use anyhow::Context;

use crate::config::PipelineConfig;
use crate::models::Document;
use crate::normalize::LocalCleaner;
use crate::ocr::{Language, OcrBackend, RemoteOcrBackend};
use crate::pdf::PopplerTools;
use crate::pipeline::DocumentProcessor;

/// Run the full pipeline over one file and print the result JSON.
pub async fn process(
    mut config: PipelineConfig,
    file: PathBuf,
    mime: Option<String>,
    language: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    if let Some(code) = language {
        config.language = Language::from_code(&code)
            .with_context(|| format!("unknown language '{}' (expected vie or eng)", code))?;
    }

    let mime = match mime {
        Some(m) => m,
        None => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            infer::get(&bytes)
                .map(|t| t.mime_type().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string())
        }
    };

    let document = Document::from_path(&file, mime)
        .with_context(|| format!("could not read {}", file.display()))?;

    eprintln!(
        "  {} Processing: {}",
        console::style("→").cyan(),
        file.display()
    );

    let processor = DocumentProcessor::new(config);
    let result = processor
        .process(&document)
        .await
        .context("document processing failed")?;

    eprintln!(
        "  {} {} pages via {} ({:.0}% confidence)",
        console::style("✓").green(),
        result.page_count,
        result.processing_method.as_str(),
        result.confidence * 100.0
    );

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}

/// Report tool and service availability.
pub async fn tools(config: PipelineConfig) -> anyhow::Result<()> {
    println!("Local binaries:");
    let mut checks = PopplerTools::check_tools();
    checks.push(("tesseract", which::which("tesseract").is_ok()));
    for (tool, available) in checks {
        let mark = if available {
            console::style("✓").green()
        } else {
            console::style("✗").red()
        };
        println!("  {} {}", mark, tool);
    }

    println!("\nRemote services:");
    let remote = RemoteOcrBackend::new(
        config.ocr_service.endpoint.clone(),
        config.chain.accept_confidence,
    );
    let mark = if remote.check_available().await {
        console::style("✓").green()
    } else {
        console::style("✗").red()
    };
    println!("  {} OCR service ({})", mark, config.ocr_service.endpoint);

    match &config.cleaning.endpoint {
        Some(endpoint) => println!("  - text cleaning service configured at {}", endpoint),
        None => println!("  - text cleaning: offline cleaner only"),
    }

    Ok(())
}

/// Run the offline cleaner over text from an argument or a file.
pub fn clean(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<()> {
    let input = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?,
        (None, None) => anyhow::bail!("provide --text or --file"),
    };

    let cleaned = LocalCleaner::new().clean(&input);
    for correction in &cleaned.corrections {
        eprintln!("  {} {}", console::style("·").dim(), correction);
    }
    println!("{}", cleaned.text);

    Ok(())
}
