use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const KM_PER_DEG: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
    }

    /// Box of `radius_km` around `center`, using 111 km per degree and a
    /// cos(lat) correction for longitude.
    pub fn around(center: &GeoPoint, radius_km: f64) -> Self {
        let dlat = radius_km / KM_PER_DEG;
        let cos_lat = center.latitude.to_radians().cos().max(0.01);
        let dlon = radius_km / (KM_PER_DEG * cos_lat);
        Self {
            min_lat: center.latitude - dlat,
            max_lat: center.latitude + dlat,
            min_lon: center.longitude - dlon,
            max_lon: center.longitude + dlon,
        }
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Offsets `center` by kilometres north/east, with the same degree conversion as [`BoundingBox::around`].
pub fn offset_km(center: &GeoPoint, north_km: f64, east_km: f64) -> GeoPoint {
    let cos_lat = center.latitude.to_radians().cos().max(0.01);
    GeoPoint {
        latitude: (center.latitude + north_km / KM_PER_DEG).clamp(-90.0, 90.0),
        longitude: (center.longitude + east_km / (KM_PER_DEG * cos_lat)).clamp(-180.0, 180.0),
    }
}

#[inline]
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}
