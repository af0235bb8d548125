use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;
use crate::tiles::TileCoordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    Tsunami,
    Flood,
    Landslide,
    HighTide,
    InternalFlood,
    Avalanche,
}

impl HazardType {
    pub const ALL: [HazardType; 6] = [
        Self::Tsunami,
        Self::Flood,
        Self::Landslide,
        Self::HighTide,
        Self::InternalFlood,
        Self::Avalanche,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tsunami => "tsunami",
            Self::Flood => "flood",
            Self::Landslide => "landslide",
            Self::HighTide => "high_tide",
            Self::InternalFlood => "internal_flood",
            Self::Avalanche => "avalanche",
        }
    }

    /// Water hazards where ground elevation matters.
    pub fn is_inundation(self) -> bool {
        matches!(
            self,
            Self::Tsunami | Self::Flood | Self::HighTide | Self::InternalFlood
        )
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HazardLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Extreme,
}

impl HazardLevel {
    /// Contribution of a static hazard to the risk score.
    pub fn score(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Extreme => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

impl fmt::Display for HazardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDetail {
    pub hazard_type: HazardType,
    pub level: HazardLevel,
    pub depth_meters: Option<f64>,
    pub description: String,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// Decoded hazard-map result for one point.
///
/// `unavailable` lists the requested types whose tile could not be fetched,
/// decoded or mapped. Those are absent from `hazards`, which is not the same
/// as "no hazard".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardInfo {
    pub location: GeoPoint,
    pub hazards: Vec<HazardDetail>,
    pub overall_risk_level: HazardLevel,
    pub tile_coordinates: TileCoordinate,
    pub analyzed_at: DateTime<Utc>,
    pub cache_key: String,
    #[serde(default)]
    pub unavailable: Vec<HazardType>,
}

impl HazardInfo {
    pub fn new(
        location: GeoPoint,
        hazards: Vec<HazardDetail>,
        tile_coordinates: TileCoordinate,
        cache_key: String,
        unavailable: Vec<HazardType>,
    ) -> Self {
        let overall_risk_level = overall_level(&hazards);
        Self {
            location,
            hazards,
            overall_risk_level,
            tile_coordinates,
            analyzed_at: Utc::now(),
            cache_key,
            unavailable,
        }
    }

    pub fn detail(&self, hazard_type: HazardType) -> Option<&HazardDetail> {
        self.hazards.iter().find(|h| h.hazard_type == hazard_type)
    }

    pub fn has_inundation_hazard(&self) -> bool {
        self.hazards
            .iter()
            .any(|h| h.hazard_type.is_inundation() && h.level > HazardLevel::None)
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// Maximum level across `hazards`, `None` when empty.
pub fn overall_level(hazards: &[HazardDetail]) -> HazardLevel {
    hazards
        .iter()
        .map(|h| h.level)
        .max()
        .unwrap_or(HazardLevel::None)
}
