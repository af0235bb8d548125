use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GeoPoint, HazardDetail, WarningInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Caution,
    Warning,
    Danger,
    Critical,
}

impl RiskLevel {
    /// Total over all scores: every value lands in exactly one tier.
    pub fn from_score(score: u32) -> Self {
        match score {
            8.. => Self::Critical,
            6..=7 => Self::Danger,
            4..=5 => Self::Warning,
            2..=3 => Self::Caution,
            0..=1 => Self::Safe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream inputs of a risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    HazardMap,
    Warnings,
    Elevation,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HazardMap => write!(f, "hazard_map"),
            Self::Warnings => write!(f, "warnings"),
            Self::Elevation => write!(f, "elevation"),
        }
    }
}

/// Fused risk for one point.
///
/// `missing_sources` is non-empty whenever an input could not be obtained.
/// A `Safe` tier with missing sources means "no evidence of danger", not
/// "confirmed safe".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub location: GeoPoint,
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub static_hazards: Vec<HazardDetail>,
    pub active_warnings: Vec<WarningInfo>,
    pub elevation: f64,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_hours: Option<u32>,
    pub assessed_at: DateTime<Utc>,
    #[serde(default)]
    pub missing_sources: Vec<DataSource>,
}

impl RiskAssessment {
    pub fn is_complete(&self) -> bool {
        self.missing_sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(2), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Warning);
        assert_eq!(RiskLevel::from_score(6), RiskLevel::Danger);
        assert_eq!(RiskLevel::from_score(8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(u32::MAX), RiskLevel::Critical);
    }

    #[test]
    fn tiers_are_monotonic() {
        let mut previous = RiskLevel::Safe;
        for score in 0..64 {
            let tier = RiskLevel::from_score(score);
            assert!(tier >= previous, "tier dropped at score {score}");
            previous = tier;
        }
    }
}
