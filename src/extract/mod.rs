//! Structured field extraction from cleaned text.
//!
//! Pure functions, no I/O: classify the document type by keyword match,
//! then apply that type's template of named-capture rules. Absent fields
//! are absent from the output map - absence is not an error.

mod template;

pub use template::{DocumentType, FieldRule, ADMINISTRATIVE_RULES, IDENTITY_RULES};

use crate::models::StructuredData;

/// Keywords marking an identity card. Checked before the administrative
/// keywords: cards also carry the national motto, so the more specific
/// class must win.
const IDENTITY_KEYWORDS: &[&str] = &[
    "CĂN CƯỚC CÔNG DÂN",
    "CHỨNG MINH NHÂN DÂN",
    "CITIZEN IDENTITY CARD",
];

const ADMINISTRATIVE_KEYWORDS: &[&str] = &[
    "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM",
    "QUYẾT ĐỊNH",
    "CÔNG VĂN",
    "THÔNG BÁO",
    "BIÊN BẢN",
    "TỜ TRÌNH",
];

/// Characters that only occur in Vietnamese text.
const VIETNAMESE_MARKERS: &str = "ăâđêôơưàáảãạằắẳẵặầấẩẫậèéẻẽẹềếểễệìíỉĩịòóỏõọồốổỗộờớởỡợùúủũụừứửữựỳýỷỹỵ";

/// Classify a document by its text content.
pub fn classify(text: &str) -> DocumentType {
    let upper = text.to_uppercase();

    if IDENTITY_KEYWORDS.iter().any(|k| upper.contains(k)) {
        return DocumentType::IdentityCard;
    }
    if ADMINISTRATIVE_KEYWORDS.iter().any(|k| upper.contains(k)) {
        return DocumentType::Administrative;
    }
    DocumentType::Unclassified
}

/// Detect the dominant language via diacritic presence.
pub fn detect_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.chars().any(|c| VIETNAMESE_MARKERS.contains(c)) {
        "vietnamese"
    } else {
        "english"
    }
}

/// Classify and extract structured fields from cleaned text.
pub fn extract_fields(text: &str) -> StructuredData {
    let doc_type = classify(text);
    let mut data = StructuredData::new(doc_type.as_str());

    let rules = match doc_type {
        DocumentType::IdentityCard => &*IDENTITY_RULES,
        DocumentType::Administrative => &*ADMINISTRATIVE_RULES,
        DocumentType::Unclassified => {
            data.fields
                .insert("language".to_string(), detect_language(text).to_string());
            return data;
        }
    };

    for rule in rules.iter() {
        // First matching rule wins per field name (the date rules overlap).
        if data.fields.contains_key(rule.name) {
            continue;
        }
        if let Some(value) = rule.apply(text) {
            data.fields.insert(rule.name.to_string(), value);
        }
    }

    data
}
