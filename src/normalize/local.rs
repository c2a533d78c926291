//! Deterministic offline Vietnamese text cleaner.
//!
//! The fallback path when the remote correction service is unavailable:
//! whitespace normalization, a fixed table of known OCR-garbled phrases
//! restored to their canonical diacritic forms, and date/number format
//! fixes. Pure and offline - this path cannot fail due to network
//! conditions.

use regex::Regex;
use std::sync::LazyLock;

/// Canonical restorations for phrases OCR commonly strips diacritics from.
///
/// Government boilerplate and identity-card labels dominate because they are
/// both high-frequency and high-value for downstream field extraction.
const PHRASE_FIXES: &[(&str, &str)] = &[
    // Government boilerplate
    (
        "CONG HOA XA HOI CHU NGHIA VIET NAM",
        "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM",
    ),
    ("Doc lap - Tu do - Hanh phuc", "Độc lập - Tự do - Hạnh phúc"),
    ("CAN CUOC CONG DAN", "CĂN CƯỚC CÔNG DÂN"),
    ("CHUNG MINH NHAN DAN", "CHỨNG MINH NHÂN DÂN"),
    // Identity-card labels
    ("Ho va ten", "Họ và tên"),
    ("Ngay sinh", "Ngày sinh"),
    ("Gioi tinh", "Giới tính"),
    ("Quoc tich", "Quốc tịch"),
    ("Que quan", "Quê quán"),
    ("Noi thuong tru", "Nơi thường trú"),
    ("Noi cap", "Nơi cấp"),
    ("Ngay cap", "Ngày cấp"),
    ("Co gia tri den", "Có giá trị đến"),
    // Major place names
    ("Ha Noi", "Hà Nội"),
    ("Ho Chi Minh", "Hồ Chí Minh"),
    ("Da Nang", "Đà Nẵng"),
    ("Hai Phong", "Hải Phòng"),
    ("Can Tho", "Cần Thơ"),
];

static PHRASE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PHRASE_FIXES
        .iter()
        .map(|(garbled, canonical)| {
            let pattern = format!("(?i){}", regex::escape(garbled));
            (Regex::new(&pattern).unwrap(), *canonical)
        })
        .collect()
});

static INLINE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// DD.MM.YYYY / DD-MM-YYYY → DD/MM/YYYY.
static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[.\-](\d{1,2})[.\-](\d{4})\b").unwrap());

/// Vietnamese ID numbers are 12 digits; OCR tends to split them in groups
/// of three.
static SPLIT_ID_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3})[ \t]+(\d{3})[ \t]+(\d{3})[ \t]+(\d{3})\b").unwrap());

/// Output of a local cleaning pass.
#[derive(Debug, Clone)]
pub struct CleanedText {
    pub text: String,
    /// Human-readable descriptions of applied corrections.
    pub corrections: Vec<String>,
}

/// Offline rule-based cleaner.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCleaner;

impl LocalCleaner {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> CleanedText {
        let mut corrections = Vec::new();

        // Whitespace: collapse runs within lines, trim line ends, cap blank
        // runs at one empty line. Line structure is preserved - the field
        // extractor matches per line.
        let collapsed = INLINE_WHITESPACE.replace_all(text, " ");
        let trimmed: String = collapsed
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        let mut cleaned = EXCESS_NEWLINES.replace_all(&trimmed, "\n\n").into_owned();
        if cleaned != text {
            corrections.push("normalized whitespace".to_string());
        }

        for (pattern, canonical) in PHRASE_PATTERNS.iter() {
            if pattern.is_match(&cleaned) {
                cleaned = pattern.replace_all(&cleaned, *canonical).into_owned();
                corrections.push(format!("restored phrase '{}'", canonical));
            }
        }

        if cleaned.contains('|') {
            cleaned = cleaned.replace('|', "I");
            corrections.push("replaced '|' artifact with 'I'".to_string());
        }

        if DATE_FORMAT.is_match(&cleaned) {
            cleaned = DATE_FORMAT.replace_all(&cleaned, "$1/$2/$3").into_owned();
            corrections.push("normalized date separators".to_string());
        }

        if SPLIT_ID_NUMBER.is_match(&cleaned) {
            cleaned = SPLIT_ID_NUMBER
                .replace_all(&cleaned, "$1$2$3$4")
                .into_owned();
            corrections.push("joined split ID number".to_string());
        }

        CleanedText {
            text: cleaned.trim().to_string(),
            corrections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restores_garbled_motto() {
        let cleaned = LocalCleaner::new().clean("CONG HOA XA HOI CHU NGHIA VIET NAM");
        assert_eq!(cleaned.text, "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM");
        assert!(cleaned
            .corrections
            .iter()
            .any(|c| c.contains("CỘNG HÒA")));
    }

    #[test]
    fn test_phrase_fix_is_case_insensitive() {
        let cleaned = LocalCleaner::new().clean("ho va ten: NGUYEN VAN A");
        assert!(cleaned.text.starts_with("Họ và tên"));
    }

    #[test]
    fn test_whitespace_preserves_lines() {
        let cleaned = LocalCleaner::new().clean("Họ và tên:   AN\n\n\n\nNgày sinh:  01/01/1990");
        assert_eq!(cleaned.text, "Họ và tên: AN\n\nNgày sinh: 01/01/1990");
    }

    #[test]
    fn test_date_separators_normalized() {
        let cleaned = LocalCleaner::new().clean("Ngày sinh: 01-01-1990 và 2.3.2001");
        assert!(cleaned.text.contains("01/01/1990"));
        assert!(cleaned.text.contains("2/3/2001"));
    }

    #[test]
    fn test_split_id_number_joined() {
        let cleaned = LocalCleaner::new().clean("Số: 001 234 567 890");
        assert!(cleaned.text.contains("001234567890"));
    }

    #[test]
    fn test_clean_is_deterministic() {
        let input = "Ho va ten | 001 234 567 890";
        let a = LocalCleaner::new().clean(input);
        let b = LocalCleaner::new().clean(input);
        assert_eq!(a.text, b.text);
        assert_eq!(a.corrections, b.corrections);
    }
}
