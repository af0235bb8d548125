//! Web Mercator slippy-tile arithmetic.
//!
//! All functions are pure. Latitude is clamped to the Mercator limit and the
//! resulting tile indices to `[0, 2^zoom)`, so every valid WGS84 coordinate
//! maps to an existing tile.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::GeoPoint;
use crate::validation::validate_zoom;

pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which the square Web Mercator world ends.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

/// `2^zoom` in floating point, so no `u8` zoom overflows. Indices past
/// `u32::MAX` saturate in the casts below.
#[inline]
fn tiles_per_axis(zoom: u8) -> f64 {
    2f64.powi(i32::from(zoom))
}

/// Fractional tile-space x, clamped inside the last tile.
fn world_x(lon: f64, zoom: u8) -> f64 {
    let n = tiles_per_axis(zoom);
    ((lon + 180.0) / 360.0 * n).clamp(0.0, n - 1e-9)
}

/// Fractional tile-space y, clamped inside the last tile.
fn world_y(lat: f64, zoom: u8) -> f64 {
    let n = tiles_per_axis(zoom);
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    y.clamp(0.0, n - 1e-9)
}

#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    world_x(lon, zoom).floor() as u32
}

#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    world_y(lat, zoom).floor() as u32
}

/// Sub-tile pixel offset, both axes in `[0, 256)`.
pub fn pixel_in_tile(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let wx = world_x(lon, zoom);
    let wy = world_y(lat, zoom);
    (
        ((wx - wx.floor()) * TILE_SIZE).min(TILE_SIZE - 1e-6),
        ((wy - wy.floor()) * TILE_SIZE).min(TILE_SIZE - 1e-6),
    )
}

pub fn tile_coordinate(point: &GeoPoint, zoom: u8) -> Result<TileCoordinate> {
    validate_zoom(zoom)?;
    let (pixel_x, pixel_y) = pixel_in_tile(point.latitude, point.longitude, zoom);
    Ok(TileCoordinate {
        zoom,
        x: lon_to_tile_x(point.longitude, zoom),
        y: lat_to_tile_y(point.latitude, zoom),
        pixel_x,
        pixel_y,
    })
}

/// North-west corner `(lat, lon)` of a tile.
pub fn tile_origin(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom);
    let lon = f64::from(x) / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * f64::from(y) / n)).sinh().atan().to_degrees();
    (lat, lon)
}
