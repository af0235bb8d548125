use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JMA kind codes that are issued as special warnings (特別警報).
const SPECIAL_WARNING_CODES: &[&str] = &["33", "35"];

/// JMA kind codes for ordinary warnings (警報).
const WARNING_CODES: &[&str] = &["02", "03", "04", "05", "06", "07", "08"];

fn is_special_series(code: &str) -> bool {
    code.len() == 2 && code.starts_with('3') && code.bytes().all(|b| b.is_ascii_digit())
}

const FLOOD_TERMS: &[&str] = &["洪水", "高潮", "浸水", "flood", "high tide", "storm surge"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Advisory,
    Warning,
    SpecialWarning,
}

impl WarningSeverity {
    /// Tier for a JMA `Kind/Code`. Other codes in the special-warning
    /// series (`3x`) rank as warnings, anything else as an advisory.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if SPECIAL_WARNING_CODES.contains(&code) {
            Self::SpecialWarning
        } else if WARNING_CODES.contains(&code) || is_special_series(code) {
            Self::Warning
        } else {
            Self::Advisory
        }
    }

    pub fn score(self) -> u32 {
        match self {
            Self::Advisory => 1,
            Self::Warning => 3,
            Self::SpecialWarning => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advisory => "advisory",
            Self::Warning => "warning",
            Self::SpecialWarning => "special_warning",
        }
    }
}

impl fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningInfo {
    pub warning_type: String,
    pub warning_code: String,
    pub area_name: String,
    pub area_code: String,
    pub severity: WarningSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl WarningInfo {
    pub fn mentions_flooding(&self) -> bool {
        let text = self.warning_type.to_lowercase();
        FLOOD_TERMS.iter().any(|term| text.contains(term))
    }

    /// Two-digit prefecture prefix of the area code, when it has one.
    pub fn prefecture(&self) -> Option<&str> {
        prefecture_prefix(&self.area_code)
    }

    /// Exact match, or either code is a prefix-sharing ancestor of the other
    /// (first two digits are the prefecture).
    pub fn applies_to(&self, area_code: &str) -> bool {
        if self.area_code == area_code {
            return true;
        }
        match (prefecture_prefix(&self.area_code), prefecture_prefix(area_code)) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

fn prefecture_prefix(code: &str) -> Option<&str> {
    code.get(..2).filter(|p| p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(kind: &str, code: &str, area_code: &str) -> WarningInfo {
        WarningInfo {
            warning_type: kind.into(),
            warning_code: code.into(),
            area_name: "千代田区".into(),
            area_code: area_code.into(),
            severity: WarningSeverity::from_code(code),
            condition: None,
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn severity_table() {
        assert_eq!(WarningSeverity::from_code("33"), WarningSeverity::SpecialWarning);
        assert_eq!(WarningSeverity::from_code("35"), WarningSeverity::SpecialWarning);
        assert_eq!(WarningSeverity::from_code("03"), WarningSeverity::Warning);
        assert_eq!(WarningSeverity::from_code("04"), WarningSeverity::Warning);
        assert_eq!(WarningSeverity::from_code("18"), WarningSeverity::Advisory);
        assert_eq!(WarningSeverity::from_code("99"), WarningSeverity::Advisory);
    }

    #[test]
    fn unlisted_special_series_ranks_as_warning() {
        for code in ["32", "36", "37", "38"] {
            assert_eq!(WarningSeverity::from_code(code), WarningSeverity::Warning, "{code}");
        }
        assert_eq!(WarningSeverity::from_code("3"), WarningSeverity::Advisory);
        assert_eq!(WarningSeverity::from_code("3a"), WarningSeverity::Advisory);
    }

    #[test]
    fn scores() {
        assert_eq!(WarningSeverity::Advisory.score(), 1);
        assert_eq!(WarningSeverity::Warning.score(), 3);
        assert_eq!(WarningSeverity::SpecialWarning.score(), 5);
    }

    #[test]
    fn area_matching_uses_prefecture_prefix() {
        let w = warning("大雨警報", "03", "1310100");
        assert!(w.applies_to("1310100"));
        assert!(w.applies_to("13"));
        assert!(w.applies_to("131130"));
        assert!(!w.applies_to("1410000"));
        assert!(!w.applies_to("x"));
    }

    #[test]
    fn flood_terms() {
        assert!(warning("洪水警報", "04", "13").mentions_flooding());
        assert!(warning("高潮注意報", "19", "13").mentions_flooding());
        assert!(warning("Flood Warning", "04", "13").mentions_flooding());
        assert!(!warning("雷注意報", "14", "13").mentions_flooding());
    }
}
