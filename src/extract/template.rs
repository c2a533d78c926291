//! Field extraction templates.
//!
//! Each document type carries a fixed set of named-capture rules. A rule
//! with multiple capture groups joins them with `/` - used by the verbose
//! Vietnamese date form ("ngày 15 tháng 3 năm 2024" → "15/3/2024").

use regex::Regex;
use std::sync::LazyLock;

/// Supported document types, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// Citizen identity card (CCCD) or the older people's ID (CMND).
    IdentityCard,
    /// Generic administrative document (decision, dispatch, report).
    Administrative,
    /// Nothing matched; only language detection applies.
    Unclassified,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityCard => "identity_card",
            Self::Administrative => "administrative_document",
            Self::Unclassified => "unclassified",
        }
    }
}

/// One named-capture extraction rule.
pub struct FieldRule {
    pub name: &'static str,
    pub pattern: Regex,
}

impl FieldRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
        }
    }

    /// Apply the rule, joining multiple capture groups with `/`.
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let parts: Vec<&str> = (1..caps.len())
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }
}

/// Identity-card field rules. Labels appear in their canonical diacritic
/// form after normalization, but matching stays case-insensitive because
/// card headers are frequently set in full caps.
pub static IDENTITY_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::new("fullName", r"(?i)Họ và tên\s*[:.]?\s*([^\n]+)"),
        FieldRule::new(
            "dateOfBirth",
            r"(?i)Ngày sinh\s*[:.]?\s*(\d{1,2}/\d{1,2}/\d{4})",
        ),
        FieldRule::new("gender", r"(?i)Giới tính\s*[:.]?\s*(Nam|Nữ)"),
        FieldRule::new("nationality", r"(?i)Quốc tịch\s*[:.]?\s*([^\n]+)"),
        FieldRule::new("origin", r"(?i)Quê quán\s*[:.]?\s*([^\n]+)"),
        FieldRule::new("residence", r"(?i)Nơi thường trú\s*[:.]?\s*([^\n]+)"),
        // 12-digit CCCD or 9-digit CMND numbers.
        FieldRule::new("idNumber", r"(?i)Số\s*[:.]?\s*(\d{12}|\d{9})\b"),
    ]
});

/// Generic administrative-document rules.
pub static ADMINISTRATIVE_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        // "Số: 123/QĐ-UBND"
        FieldRule::new(
            "caseNumber",
            r"(?i)Số\s*[:.]?\s*(\d+[/-][[:alnum:]ĐđÀ-ỹ/-]+)",
        ),
        // "ngày 15 tháng 3 năm 2024", falling back to numeric dates.
        FieldRule::new(
            "date",
            r"(?i)ngày\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})",
        ),
        FieldRule::new("date", r"\b(\d{1,2}/\d{1,2}/\d{4})\b"),
        // Secrecy gradings, highest first so "TỐI MẬT" never matches as "MẬT".
        FieldRule::new("classification", r"(TUYỆT MẬT|TỐI MẬT|MẬT)\b"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rules_extract_card_fields() {
        let text = "CĂN CƯỚC CÔNG DÂN\nSố: 001234567890\nHọ và tên: NGUYỄN VĂN A\nNgày sinh: 01/01/1990\nGiới tính: Nam";
        let fields: Vec<(&str, String)> = IDENTITY_RULES
            .iter()
            .filter_map(|r| r.apply(text).map(|v| (r.name, v)))
            .collect();
        assert!(fields.contains(&("idNumber", "001234567890".to_string())));
        assert!(fields.contains(&("fullName", "NGUYỄN VĂN A".to_string())));
        assert!(fields.contains(&("dateOfBirth", "01/01/1990".to_string())));
        assert!(fields.contains(&("gender", "Nam".to_string())));
    }

    #[test]
    fn test_nine_digit_id_accepted() {
        let rule = &IDENTITY_RULES[6];
        assert_eq!(rule.apply("Số: 012345678"), Some("012345678".to_string()));
    }

    #[test]
    fn test_verbose_date_joined_with_slashes() {
        let rule = &ADMINISTRATIVE_RULES[1];
        assert_eq!(
            rule.apply("Hà Nội, ngày 15 tháng 3 năm 2024"),
            Some("15/3/2024".to_string())
        );
    }

    #[test]
    fn test_classification_prefers_highest_grade() {
        let rule = ADMINISTRATIVE_RULES
            .iter()
            .find(|r| r.name == "classification")
            .unwrap();
        assert_eq!(rule.apply("TỐI MẬT"), Some("TỐI MẬT".to_string()));
        assert_eq!(rule.apply("Độ mật: MẬT"), Some("MẬT".to_string()));
    }

    #[test]
    fn test_unmatched_rule_returns_none() {
        let rule = &IDENTITY_RULES[1];
        assert_eq!(rule.apply("no dates here"), None);
    }
}
