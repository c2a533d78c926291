//! MIME type verification and categorization.

/// Input families the pipeline knows how to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Image,
    Unsupported,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Categorize a MIME type into an input kind.
pub fn input_kind(mime: &str) -> InputKind {
    let mime = normalize_mime(mime);
    if mime == "application/pdf" {
        InputKind::Pdf
    } else if mime == "image/jpeg" || mime == "image/png" || mime == "image/tiff" {
        InputKind::Image
    } else {
        InputKind::Unsupported
    }
}

/// Strip parameters (charset etc.) and lowercase.
fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or(mime).trim().to_lowercase()
}

/// Verify a declared MIME type against file magic bytes.
///
/// Uploads routinely arrive with extension-derived MIME types that do not
/// match the actual content. When the detected type family differs from the
/// declared one (or the declared type is the generic octet-stream), the
/// detected type wins; otherwise the declared type is kept.
pub fn verify_mime(content: &[u8], declared: &str) -> String {
    let declared_norm = normalize_mime(declared);

    let Some(detected) = infer::get(&content[..content.len().min(8192)]) else {
        return declared_norm;
    };
    let detected_mime = detected.mime_type();

    if declared_norm == "application/octet-stream" || declared_norm.is_empty() {
        return detected_mime.to_string();
    }

    let declared_base = declared_norm.split('/').next().unwrap_or("");
    let detected_base = detected_mime.split('/').next().unwrap_or("");

    if declared_base != detected_base {
        // Different type families - trust the content
        return detected_mime.to_string();
    }

    declared_norm
}
