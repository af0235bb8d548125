//! Point → administrative area code lookup over a static bounding-box table.

use std::collections::BTreeMap;
use std::fs;

use serde::Deserialize;

use crate::errors::{EngineError, Result};
use crate::geo::BoundingBox;
use crate::models::GeoPoint;
use crate::validation::validate_radius;

const DEFAULT_AREA_TABLE: &str = include_str!("../data/area_bounds.json");

#[derive(Debug, Clone, Deserialize)]
pub struct City {
    pub name: String,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prefecture {
    pub name: String,
    pub bounds: BoundingBox,
    #[serde(default)]
    pub cities: BTreeMap<String, City>,
}

#[derive(Debug, Deserialize)]
struct AreaTable {
    prefectures: BTreeMap<String, Prefecture>,
}

#[derive(Debug, Clone)]
pub struct AreaCodeMapper {
    prefectures: BTreeMap<String, Prefecture>,
}

impl AreaCodeMapper {
    /// The compiled-in table.
    pub fn bundled() -> Result<Self> {
        Self::from_json(DEFAULT_AREA_TABLE)
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|err| {
            EngineError::Configuration(format!("cannot read area table {path}: {err}"))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: AreaTable = serde_json::from_str(json)
            .map_err(|err| EngineError::Configuration(format!("invalid area table: {err}")))?;
        verify(&table.prefectures)?;
        log::debug!(
            "Loaded area table: {} prefectures, {} cities",
            table.prefectures.len(),
            table.prefectures.values().map(|p| p.cities.len()).sum::<usize>()
        );
        Ok(Self {
            prefectures: table.prefectures,
        })
    }

    /// Most specific code containing `point`: a city if any city box
    /// matches, otherwise the first matching prefecture.
    pub fn area_code_for(&self, point: &GeoPoint) -> Option<String> {
        let mut prefecture_match = None;
        for (code, prefecture) in &self.prefectures {
            if !prefecture.bounds.contains(point) {
                continue;
            }
            if let Some((city_code, _)) = prefecture
                .cities
                .iter()
                .find(|(_, city)| city.bounds.contains(point))
            {
                return Some(city_code.clone());
            }
            prefecture_match.get_or_insert(code);
        }
        prefecture_match.cloned()
    }

    /// Every prefecture and city code whose box overlaps the box of
    /// `radius_km` around `point`.
    pub fn nearby_area_codes(&self, point: &GeoPoint, radius_km: f64) -> Result<Vec<String>> {
        validate_radius(radius_km)?;
        let search = BoundingBox::around(point, radius_km);
        let mut codes = Vec::new();
        for (code, prefecture) in &self.prefectures {
            if !prefecture.bounds.overlaps(&search) {
                continue;
            }
            codes.push(code.clone());
            codes.extend(
                prefecture
                    .cities
                    .iter()
                    .filter(|(_, city)| city.bounds.overlaps(&search))
                    .map(|(city_code, _)| city_code.clone()),
            );
        }
        Ok(codes)
    }

    pub fn area_name(&self, code: &str) -> Option<&str> {
        if let Some(prefecture) = self.prefectures.get(code) {
            return Some(&prefecture.name);
        }
        self.prefectures
            .values()
            .find_map(|p| p.cities.get(code))
            .map(|city| city.name.as_str())
    }
}

fn verify(prefectures: &BTreeMap<String, Prefecture>) -> Result<()> {
    for (code, prefecture) in prefectures {
        if !prefecture.bounds.is_well_formed() {
            return Err(EngineError::Configuration(format!(
                "prefecture {code} has inverted bounds"
            )));
        }
        for (city_code, city) in &prefecture.cities {
            if !city.bounds.is_well_formed() {
                return Err(EngineError::Configuration(format!(
                    "city {city_code} has inverted bounds"
                )));
            }
            if !prefecture.bounds.contains_box(&city.bounds) {
                return Err(EngineError::Configuration(format!(
                    "city {city_code} ({}) extends outside prefecture {code} ({})",
                    city.name, prefecture.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> AreaCodeMapper {
        AreaCodeMapper::bundled().expect("bundled table is valid")
    }

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn city_code_inside_city_box() {
        // Tokyo Station, Chiyoda.
        assert_eq!(mapper().area_code_for(&p(35.6812, 139.7671)), Some("13101".into()));
    }

    #[test]
    fn prefecture_code_outside_cities() {
        // Hachioji: inside Tokyo's box but none of the bundled wards.
        assert_eq!(mapper().area_code_for(&p(35.6664, 139.3160)), Some("13".into()));
    }

    #[test]
    fn no_code_outside_table() {
        assert_eq!(mapper().area_code_for(&p(43.0621, 141.3544)), None);
    }

    #[test]
    fn nearby_includes_neighbouring_prefecture() {
        let codes = mapper().nearby_area_codes(&p(35.58, 139.70), 10.0).unwrap();
        assert!(codes.contains(&"13".to_string()));
        assert!(codes.contains(&"14".to_string()));
        assert!(codes.contains(&"13111".to_string()));
        assert!(!codes.contains(&"27".to_string()));
    }

    #[test]
    fn nearby_rejects_bad_radius() {
        assert!(mapper().nearby_area_codes(&p(35.0, 139.0), -1.0).is_err());
    }

    #[test]
    fn names() {
        let m = mapper();
        assert_eq!(m.area_name("13"), Some("東京都"));
        assert_eq!(m.area_name("27100"), Some("大阪市"));
        assert_eq!(m.area_name("99"), None);
    }

    #[test]
    fn rejects_city_outside_prefecture() {
        let json = r#"{"prefectures": {"01": {
            "name": "A",
            "bounds": {"min_lat": 0, "max_lat": 1, "min_lon": 0, "max_lon": 1},
            "cities": {"01100": {"name": "B",
                "bounds": {"min_lat": 0.5, "max_lat": 1.5, "min_lon": 0, "max_lon": 1}}}
        }}}"#;
        let err = AreaCodeMapper::from_json(json).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AreaCodeMapper::from_json("{").is_err());
    }
}
