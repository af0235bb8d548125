use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{GeoPoint, HazardLevel, HazardType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    Tsunami,
    Flood,
    HighTide,
    Landslide,
    Other,
}

impl DisasterType {
    pub fn hazard_type(self) -> Option<HazardType> {
        match self {
            Self::Tsunami => Some(HazardType::Tsunami),
            Self::Flood => Some(HazardType::Flood),
            Self::HighTide => Some(HazardType::HighTide),
            Self::Landslide => Some(HazardType::Landslide),
            Self::Other => None,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "tsunami" => Self::Tsunami,
            "flood" => Self::Flood,
            "high_tide" | "hightide" | "storm_surge" => Self::HighTide,
            "landslide" => Self::Landslide,
            _ => Self::Other,
        }
    }
}

/// A shelter supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShelterCandidate {
    #[validate(length(min = 1))]
    pub id: String,
    pub name: String,
    #[validate(nested)]
    pub location: GeoPoint,
    pub capacity: u32,
    pub building_floors: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeShelterResult {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub elevation: f64,
    pub building_floors: Option<u32>,
    pub capacity: u32,
    pub distance_km: f64,
    pub estimated_minutes: f64,
    pub is_type_safe: bool,
    pub is_safe: bool,
    pub safety_score: f64,
    pub hazard_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSafety {
    pub max_risk_level: HazardLevel,
    pub is_safe: bool,
    pub recommendation: String,
    /// Indices of route points above `medium`.
    pub dangerous_segments: Vec<usize>,
}
