//! Fuses static hazard, live warnings and elevation into one risk tier.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::cache::Cache;
use crate::elevation::ElevationResolver;
use crate::geo::round_to;
use crate::hazard::HazardMapService;
use crate::models::{
    DataSource, GeoPoint, HazardInfo, HazardLevel, RiskAssessment, RiskLevel, WarningInfo,
    WarningSeverity,
};
use crate::warnings::WarningAggregator;

/// Below this elevation an inundation hazard or a flood warning adds the
/// low-lying factor.
pub const LOW_LYING_METERS: f64 = 5.0;

const LOW_LYING_FACTOR: &str = "Low-lying area (below 5 m) exposed to inundation";
const LOW_LYING_ADVICE: &str =
    "Ground level is low: evacuate early to higher ground or an upper floor of a sturdy building";

fn recommendations_for(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Safe => &[
            "No immediate danger detected",
            "Check your local hazard map and evacuation sites in advance",
        ],
        RiskLevel::Caution => &[
            "Stay alert to weather information",
            "Confirm your evacuation route and nearest shelter",
            "Prepare an emergency kit",
        ],
        RiskLevel::Warning => &[
            "Prepare to evacuate at short notice",
            "Elderly people and those needing assistance should start evacuating",
            "Avoid rivers, coastlines and steep slopes",
        ],
        RiskLevel::Danger => &[
            "Evacuate to a designated shelter now",
            "If leaving is unsafe, move to the highest floor of a sturdy building",
            "Follow instructions from local authorities",
        ],
        RiskLevel::Critical => &[
            "Take action to save your life immediately",
            "Move to the highest safe location available without delay",
            "Do not wait for further instructions",
        ],
    }
}

pub struct RiskAssessor {
    hazards: Arc<HazardMapService>,
    warnings: Arc<WarningAggregator>,
    elevation: Arc<ElevationResolver>,
    cache: Cache<String, RiskAssessment>,
}

impl RiskAssessor {
    pub fn new(
        hazards: Arc<HazardMapService>,
        warnings: Arc<WarningAggregator>,
        elevation: Arc<ElevationResolver>,
        cache: Cache<String, RiskAssessment>,
    ) -> Self {
        Self {
            hazards,
            warnings,
            elevation,
            cache,
        }
    }

    pub fn cache_key(point: &GeoPoint) -> String {
        format!(
            "risk:{:.3}:{:.3}",
            round_to(point.latitude, 3),
            round_to(point.longitude, 3)
        )
    }

    /// Never fails: every input that cannot be obtained is logged, replaced
    /// by its empty value and listed in `missing_sources`.
    pub async fn assess_risk(&self, point: &GeoPoint) -> RiskAssessment {
        let key = Self::cache_key(point);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Risk cache hit {key}");
            return hit;
        }

        let (hazard, warnings, elevation) = tokio::join!(
            self.hazards.get_hazard_info(point, &[], None),
            self.warnings.get_warnings_for_location(point),
            self.elevation.try_get_elevation(point),
        );

        let mut missing = Vec::new();
        let hazard = match hazard {
            Ok(info) => {
                if !info.is_complete() {
                    missing.push(DataSource::HazardMap);
                }
                Some(info)
            }
            Err(err) => {
                log::warn!("Risk {key}: hazard map unavailable ({}): {err}", err.kind());
                missing.push(DataSource::HazardMap);
                None
            }
        };
        let warnings = warnings.unwrap_or_else(|err| {
            log::warn!("Risk {key}: warnings unavailable ({}): {err}", err.kind());
            missing.push(DataSource::Warnings);
            Vec::new()
        });
        let elevation = match elevation {
            Ok(meters) => meters.unwrap_or(0.0),
            Err(err) => {
                log::warn!("Risk {key}: elevation unavailable ({}): {err}", err.kind());
                missing.push(DataSource::Elevation);
                0.0
            }
        };

        if missing.len() == 3 {
            log::warn!("Risk {key}: every source failed, result carries no evidence");
        }

        let assessment = evaluate(*point, hazard.as_ref(), warnings, elevation, missing);
        log::info!(
            "Assessed {key}: {} (score {})",
            assessment.risk_level,
            assessment.risk_score
        );
        self.cache.insert(key, assessment.clone());
        assessment
    }
}

/// One warning per (code, prefecture). Bulletins repeat a kind for the
/// prefecture, its sub-regions and each municipality, and every copy shares
/// the prefix the location matched on. The first copy is kept, which is the
/// newest for a merged list.
pub fn collapse_repeats(warnings: Vec<WarningInfo>) -> Vec<WarningInfo> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|w| {
            let scope = w.prefecture().unwrap_or(w.area_code.as_str()).to_string();
            seen.insert((w.warning_code.clone(), scope))
        })
        .collect()
}

/// Scoring, tiering, factors and recommendations from already-fetched inputs.
pub fn evaluate(
    location: GeoPoint,
    hazard: Option<&HazardInfo>,
    active_warnings: Vec<WarningInfo>,
    elevation: f64,
    missing_sources: Vec<DataSource>,
) -> RiskAssessment {
    let active_warnings = collapse_repeats(active_warnings);
    let static_hazards = hazard.map(|h| h.hazards.clone()).unwrap_or_default();
    let static_level = hazard.map(|h| h.overall_risk_level).unwrap_or_default();

    let risk_score = static_level.score()
        + active_warnings
            .iter()
            .map(|w| w.severity.score())
            .sum::<u32>();
    let risk_level = RiskLevel::from_score(risk_score);

    let mut risk_factors: Vec<String> = static_hazards
        .iter()
        .filter(|h| h.level > HazardLevel::None)
        .map(|h| h.description.clone())
        .collect();
    risk_factors.extend(
        active_warnings
            .iter()
            .map(|w| format!("{} in effect for {}", w.warning_type, w.area_name)),
    );

    let mut recommendations: Vec<String> = recommendations_for(risk_level)
        .iter()
        .map(|r| r.to_string())
        .collect();

    let water_threat = hazard.is_some_and(HazardInfo::has_inundation_hazard)
        || active_warnings.iter().any(WarningInfo::mentions_flooding);
    if elevation < LOW_LYING_METERS && water_threat {
        risk_factors.push(LOW_LYING_FACTOR.to_string());
        recommendations.push(LOW_LYING_ADVICE.to_string());
    }

    RiskAssessment {
        location,
        risk_level,
        risk_score,
        static_hazards,
        urgency_hours: urgency_hours(&active_warnings, risk_score),
        active_warnings,
        elevation,
        risk_factors,
        recommendations,
        assessed_at: Utc::now(),
        missing_sources,
    }
}

/// Hours until action is needed: now under a warning, soon when the score
/// is elevated, later when only advisories are out.
pub fn urgency_hours(warnings: &[WarningInfo], risk_score: u32) -> Option<u32> {
    if warnings.iter().any(|w| w.severity >= WarningSeverity::Warning) {
        Some(0)
    } else if risk_score > 2 {
        Some(3)
    } else if !warnings.is_empty() {
        Some(6)
    } else {
        None
    }
}
