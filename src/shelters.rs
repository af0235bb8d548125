//! Shelter screening against the hazard at hand, and route safety.

use std::sync::Arc;

use futures::future::join_all;
use validator::Validate;

use crate::elevation::ElevationResolver;
use crate::geo::{haversine_km, round_to};
use crate::models::{
    DisasterType, GeoPoint, HazardDetail, HazardInfo, HazardLevel, RouteSafety, SafeShelterResult,
    ShelterCandidate,
};

pub const DEFAULT_MAX_RESULTS: usize = 20;

const WALKING_SPEED_KMH: f64 = 4.0;
const EMERGENCY_WALKING_SPEED_KMH: f64 = 3.0;

/// Metres of ground above the expected inundation depth a shelter needs.
pub fn required_margin(disaster_type: DisasterType) -> f64 {
    match disaster_type {
        DisasterType::Tsunami => 5.0,
        DisasterType::Flood => 2.0,
        DisasterType::HighTide => 3.0,
        DisasterType::Landslide | DisasterType::Other => 2.0,
    }
}

pub fn min_score(disaster_type: DisasterType) -> f64 {
    match disaster_type {
        DisasterType::Tsunami => 0.6,
        DisasterType::Flood | DisasterType::HighTide => 0.4,
        DisasterType::Landslide | DisasterType::Other => 0.5,
    }
}

/// 0 below the water line, 0.5 at exactly the required margin, approaching
/// 1.0 at three times the margin and capped there.
pub fn margin_score(actual_margin: f64, required_margin: f64) -> f64 {
    if actual_margin < 0.0 {
        0.0
    } else if actual_margin < required_margin {
        actual_margin / required_margin * 0.5
    } else {
        let surplus = (actual_margin - required_margin) / (2.0 * required_margin);
        (0.5 + surplus.min(1.0) * 0.5).min(1.0)
    }
}

/// Used when the hazard map gives a level but no depth.
pub fn level_score(level: HazardLevel) -> f64 {
    match level {
        HazardLevel::None => 1.0,
        HazardLevel::Low => 0.7,
        HazardLevel::Medium => 0.5,
        HazardLevel::High => 0.3,
        HazardLevel::Extreme => 0.1,
    }
}

/// Parameters of one shelter search.
#[derive(Debug, Clone)]
pub struct ShelterQuery {
    pub disaster_type: DisasterType,
    pub user_location: Option<GeoPoint>,
    pub max_results: usize,
    /// Slower walking pace for travel-time estimates.
    pub emergency: bool,
}

impl ShelterQuery {
    pub fn new(disaster_type: DisasterType) -> Self {
        Self {
            disaster_type,
            user_location: None,
            max_results: DEFAULT_MAX_RESULTS,
            emergency: false,
        }
    }

    pub fn near(mut self, location: GeoPoint) -> Self {
        self.user_location = Some(location);
        self
    }

    pub fn limit(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }

    fn walking_speed_kmh(&self) -> f64 {
        if self.emergency {
            EMERGENCY_WALKING_SPEED_KMH
        } else {
            WALKING_SPEED_KMH
        }
    }
}

struct Safety {
    score: f64,
    is_type_safe: bool,
    summary: String,
}

/// Scores one shelter at `elevation` against the hazard relevant to
/// `disaster_type`. For tsunami, `is_type_safe` is the raw margin check;
/// for every other type it follows the score threshold. When the relevant
/// hazard layer could not be read the shelter scores as a medium hazard and
/// is never type-safe.
fn assess_shelter(hazard_info: &HazardInfo, disaster_type: DisasterType, elevation: f64) -> Safety {
    let required = required_margin(disaster_type);
    let detail: Option<&HazardDetail> = disaster_type
        .hazard_type()
        .and_then(|hazard_type| hazard_info.detail(hazard_type));
    let unread = disaster_type
        .hazard_type()
        .filter(|hazard_type| hazard_info.unavailable.contains(hazard_type));

    let (score, margin_ok, summary) = match (detail, detail.and_then(|d| d.depth_meters), unread) {
        (Some(detail), Some(depth), _) => {
            let margin = elevation - depth;
            (
                margin_score(margin, required),
                margin >= required,
                format!(
                    "{}: {:.1} m expected, shelter at {elevation:.1} m (margin {margin:.1} m, needs {required:.1} m)",
                    detail.hazard_type, depth
                ),
            )
        }
        (Some(detail), None, _) => (
            level_score(detail.level),
            detail.level <= HazardLevel::Low,
            format!("{}: {} hazard, depth unknown", detail.hazard_type, detail.level),
        ),
        (None, _, Some(hazard_type)) => (
            level_score(HazardLevel::Medium),
            false,
            format!("{hazard_type}: hazard data unavailable"),
        ),
        (None, _, None) => {
            let level = match disaster_type {
                DisasterType::Other => hazard_info.overall_risk_level,
                _ => HazardLevel::None,
            };
            let summary = if level == HazardLevel::None {
                "No mapped hazard at this location".to_string()
            } else {
                format!("Overall {level} hazard")
            };
            (level_score(level), level == HazardLevel::None, summary)
        }
    };

    let is_safe = score >= min_score(disaster_type);
    Safety {
        score,
        is_type_safe: match disaster_type {
            DisasterType::Tsunami => margin_ok,
            _ => is_safe && unread.is_none(),
        },
        summary,
    }
}

pub struct ShelterSafetyFilter {
    elevation: Arc<ElevationResolver>,
}

impl ShelterSafetyFilter {
    pub fn new(elevation: Arc<ElevationResolver>) -> Self {
        Self { elevation }
    }

    /// Safe shelters only, best score first, nearer first on ties.
    /// Candidates that fail validation are skipped.
    pub async fn filter_safe_shelters(
        &self,
        shelters: &[ShelterCandidate],
        hazard_info: &HazardInfo,
        query: &ShelterQuery,
    ) -> Vec<SafeShelterResult> {
        let candidates: Vec<&ShelterCandidate> = shelters
            .iter()
            .filter(|s| match s.validate() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("Skipping shelter {:?}: {err}", s.id);
                    false
                }
            })
            .collect();

        let evaluated = join_all(
            candidates
                .iter()
                .map(|shelter| self.evaluate(shelter, hazard_info, query)),
        )
        .await;

        let total = evaluated.len();
        let mut safe: Vec<SafeShelterResult> = evaluated.into_iter().filter(|r| r.is_safe).collect();
        safe.sort_by(|a, b| {
            b.safety_score
                .total_cmp(&a.safety_score)
                .then(a.distance_km.total_cmp(&b.distance_km))
        });
        let safe_count = safe.len();
        safe.truncate(query.max_results);
        log::debug!(
            "{safe_count} of {total} shelters safe for {:?}, returning {}",
            query.disaster_type,
            safe.len()
        );
        safe
    }

    async fn evaluate(
        &self,
        shelter: &ShelterCandidate,
        hazard_info: &HazardInfo,
        query: &ShelterQuery,
    ) -> SafeShelterResult {
        let elevation = self.elevation.get_elevation(&shelter.location).await;
        let safety = assess_shelter(hazard_info, query.disaster_type, elevation);

        let distance_km = query
            .user_location
            .map(|from| haversine_km(&from, &shelter.location))
            .unwrap_or(0.0);
        let estimated_minutes = distance_km / query.walking_speed_kmh() * 60.0;

        SafeShelterResult {
            id: shelter.id.clone(),
            name: shelter.name.clone(),
            location: shelter.location,
            elevation,
            building_floors: shelter.building_floors,
            capacity: shelter.capacity,
            distance_km: round_to(distance_km, 3),
            estimated_minutes: round_to(estimated_minutes, 1),
            is_type_safe: safety.is_type_safe,
            is_safe: safety.score >= min_score(query.disaster_type),
            safety_score: safety.score,
            hazard_summary: safety.summary,
        }
    }
}

fn route_recommendation(level: HazardLevel) -> &'static str {
    match level {
        HazardLevel::None => "Route passes no mapped hazard zones",
        HazardLevel::Low => "Route crosses low-hazard areas, proceed with care",
        HazardLevel::Medium => "Route crosses moderate hazard areas, move quickly and avoid waterways",
        HazardLevel::High => "Route crosses high-hazard areas, choose another route if possible",
        HazardLevel::Extreme => "Route crosses extreme-hazard areas, do not use this route",
    }
}

/// Classifies an ordered route by the worst hazard level along it. Safe
/// when nothing above `medium` is crossed.
pub fn evaluate_route_safety(route: &[HazardInfo]) -> RouteSafety {
    let max_risk_level = route
        .iter()
        .map(|info| info.overall_risk_level)
        .max()
        .unwrap_or_default();
    let dangerous_segments = route
        .iter()
        .enumerate()
        .filter(|(_, info)| info.overall_risk_level > HazardLevel::Medium)
        .map(|(index, _)| index)
        .collect();

    let mut recommendation = route_recommendation(max_risk_level).to_string();
    let incomplete = route.iter().filter(|info| !info.is_complete()).count();
    if incomplete > 0 {
        recommendation.push_str(&format!(
            " (hazard data incomplete at {incomplete} of {} points)",
            route.len()
        ));
    }

    RouteSafety {
        max_risk_level,
        is_safe: max_risk_level <= HazardLevel::Medium,
        recommendation,
        dangerous_segments,
    }
}
