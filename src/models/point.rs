use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::Result;

/// WGS84 coordinate, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(custom(function = "crate::validation::validate_lat"))]
    pub latitude: f64,
    #[validate(custom(function = "crate::validation::validate_lon"))]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self { latitude, longitude };
        point.validate()?;
        Ok(point)
    }

    /// `"lat,lon"` with the given number of decimals. Used as a cache and map key.
    pub fn key(&self, decimals: usize) -> String {
        format!(
            "{:.*},{:.*}",
            decimals, self.latitude, decimals, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(GeoPoint::new(35.0, 139.0).is_ok());
        assert!(GeoPoint::new(91.0, 139.0).is_err());
        assert!(GeoPoint::new(35.0, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn key_rounds() {
        let p = GeoPoint::new(35.681236, 139.767125).unwrap();
        assert_eq!(p.key(3), "35.681,139.767");
        assert_eq!(p.key(4), "35.6812,139.7671");
    }
}
