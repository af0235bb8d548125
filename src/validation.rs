use crate::errors::EngineError;
use validator::ValidationError;

pub const MIN_ZOOM: u8 = 2;
pub const MAX_ZOOM: u8 = 17;
pub const MAX_RADIUS_KM: f64 = 500.0;
pub const MAX_GRID_POINTS: usize = 21;

pub fn validate_lat(lat: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::new("latitude"));
    }
    Ok(())
}

pub fn validate_lon(lon: f64) -> Result<(), ValidationError> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::new("longitude"));
    }
    Ok(())
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), EngineError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(EngineError::Validation(
            "Coordinates must be finite numbers".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(EngineError::Validation(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(EngineError::Validation(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_zoom(zoom: u8) -> Result<(), EngineError> {
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(EngineError::Validation(format!(
            "Zoom must be between {MIN_ZOOM} and {MAX_ZOOM}, got {zoom}"
        )));
    }
    Ok(())
}

pub fn validate_radius(radius_km: f64) -> Result<(), EngineError> {
    if !radius_km.is_finite() || radius_km < 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(EngineError::Validation(format!(
            "Radius must be between 0 and {MAX_RADIUS_KM} km"
        )));
    }
    Ok(())
}

pub fn validate_grid(spacing_km: f64, grid_points: usize) -> Result<(), EngineError> {
    if !spacing_km.is_finite() || spacing_km <= 0.0 {
        return Err(EngineError::Validation(
            "Grid spacing must be a positive number of kilometres".to_string(),
        ));
    }
    if grid_points == 0 || grid_points > MAX_GRID_POINTS {
        return Err(EngineError::Validation(format!(
            "Grid side must contain between 1 and {MAX_GRID_POINTS} points"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds() {
        assert!(validate_coordinates(35.68, 139.76).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn zoom_range() {
        assert!(validate_zoom(2).is_ok());
        assert!(validate_zoom(17).is_ok());
        assert!(validate_zoom(1).is_err());
        assert!(validate_zoom(18).is_err());
    }

    #[test]
    fn grid_limits() {
        assert!(validate_grid(0.5, 3).is_ok());
        assert!(validate_grid(0.0, 3).is_err());
        assert!(validate_grid(1.0, 0).is_err());
        assert!(validate_grid(1.0, MAX_GRID_POINTS + 1).is_err());
    }
}
