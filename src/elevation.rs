//! Ground elevation lookups behind a one-request-per-interval gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::Cache;
use crate::errors::{EngineError, Result};
use crate::geo::offset_km;
use crate::hazard::USER_AGENT;
use crate::models::GeoPoint;
use crate::rate_limit::RateLimiter;
use crate::validation::validate_grid;

/// Provider placeholder for cells without a DEM value (sea, outside coverage).
const NO_DATA_SENTINEL: &str = "-----";

/// Cache precision, roughly 11 m.
const CACHE_DECIMALS: usize = 4;

/// `Ok(None)` means the provider answered but has no value for the point.
#[async_trait]
pub trait ElevationSource: Send + Sync {
    async fn fetch_elevation(&self, point: &GeoPoint) -> Result<Option<f64>>;
}

pub struct GsiElevationSource {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    elevation: Value,
}

impl GsiElevationSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| EngineError::Configuration(format!("elevation HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ElevationSource for GsiElevationSource {
    async fn fetch_elevation(&self, point: &GeoPoint) -> Result<Option<f64>> {
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("outtype", "JSON".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_elevation_body(&body)
    }
}

/// Accepts a number, a numeric string, the `"-----"` sentinel or `null`.
pub fn parse_elevation_body(body: &str) -> Result<Option<f64>> {
    let response: ElevationResponse = serde_json::from_str(body)?;
    match response.elevation {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| EngineError::Parse(format!("elevation out of range: {n}"))),
        Value::String(s) if s.trim() == NO_DATA_SENTINEL || s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| EngineError::Parse(format!("non-numeric elevation {s:?}"))),
        other => Err(EngineError::Parse(format!("unexpected elevation value {other}"))),
    }
}

/// Key used in [`ElevationResolver::get_elevations_batch`] results.
pub fn batch_key(point: &GeoPoint) -> String {
    format!("{},{}", point.latitude, point.longitude)
}

pub struct ElevationResolver {
    source: Arc<dyn ElevationSource>,
    limiter: RateLimiter,
    cache: Cache<String, Option<f64>>,
}

impl ElevationResolver {
    pub fn new(source: Arc<dyn ElevationSource>, limiter: RateLimiter, cache: Cache<String, Option<f64>>) -> Self {
        Self { source, limiter, cache }
    }

    /// `Ok(None)` when the provider has no data for the point; `Err` on
    /// network or parse failure. Failures are not cached.
    pub async fn try_get_elevation(&self, point: &GeoPoint) -> Result<Option<f64>> {
        let key = point.key(CACHE_DECIMALS);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let _permit = self.limiter.acquire().await?;
        // Another caller may have filled the entry while we waited for the gate.
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let elevation = self.source.fetch_elevation(point).await?;
        self.cache.insert(key, elevation);
        Ok(elevation)
    }

    /// Elevation in metres. `0.0` stands for "unknown, assumed sea level"
    /// whenever the lookup fails or the provider has no data.
    pub async fn get_elevation(&self, point: &GeoPoint) -> f64 {
        match self.try_get_elevation(point).await {
            Ok(Some(meters)) => meters,
            Ok(None) => {
                log::info!("No elevation data at {}, assuming 0.0 m", point.key(CACHE_DECIMALS));
                0.0
            }
            Err(err) => {
                log::warn!(
                    "Elevation lookup failed at {} ({}): {err}",
                    point.key(CACHE_DECIMALS),
                    err.kind()
                );
                0.0
            }
        }
    }

    /// Sequential on purpose: every lookup passes the shared rate gate anyway.
    pub async fn get_elevations_batch(&self, points: &[GeoPoint]) -> HashMap<String, f64> {
        let mut results = HashMap::with_capacity(points.len());
        for point in points {
            let elevation = self.get_elevation(point).await;
            results.insert(batch_key(point), elevation);
        }
        results
    }

    /// `grid_points × grid_points` lookups centred on `center`, for cache pre-warming.
    pub async fn get_grid_elevations(
        &self,
        center: &GeoPoint,
        spacing_km: f64,
        grid_points: usize,
    ) -> Result<Vec<(GeoPoint, f64)>> {
        validate_grid(spacing_km, grid_points)?;
        let half = (grid_points as f64 - 1.0) / 2.0;
        let mut grid = Vec::with_capacity(grid_points * grid_points);
        for row in 0..grid_points {
            for col in 0..grid_points {
                let point = offset_km(
                    center,
                    (row as f64 - half) * spacing_km,
                    (col as f64 - half) * spacing_km,
                );
                let elevation = self.get_elevation(&point).await;
                grid.push((point, elevation));
            }
        }
        log::info!(
            "Pre-warmed {} elevation cells around {}",
            grid.len(),
            center.key(CACHE_DECIMALS)
        );
        Ok(grid)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    /// Per-point values, falling back to `default`; `fail_all` turns every call into a network error.
    pub(crate) struct FakeElevation {
        pub values: Mutex<HashMap<String, Option<f64>>>,
        pub default: Option<f64>,
        pub fail_all: bool,
        pub calls: AtomicUsize,
    }

    impl FakeElevation {
        pub fn constant(meters: f64) -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
                default: Some(meters),
                fail_all: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail_all: true,
                ..Self::constant(0.0)
            }
        }

        pub fn with(self, point: &GeoPoint, meters: Option<f64>) -> Self {
            self.values.lock().insert(point.key(CACHE_DECIMALS), meters);
            self
        }
    }

    #[async_trait]
    impl ElevationSource for FakeElevation {
        async fn fetch_elevation(&self, point: &GeoPoint) -> Result<Option<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(EngineError::Network("elevation endpoint unreachable".into()));
            }
            Ok(self
                .values
                .lock()
                .get(&point.key(CACHE_DECIMALS))
                .copied()
                .unwrap_or(self.default))
        }
    }

    pub(crate) fn resolver(source: Arc<FakeElevation>) -> ElevationResolver {
        ElevationResolver::new(
            source,
            RateLimiter::new(Duration::from_secs(1)),
            Cache::new(Duration::from_secs(3600)),
        )
    }

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn parses_number_and_string() {
        assert_eq!(parse_elevation_body(r#"{"elevation": 12.5, "hsrc": "5m"}"#).unwrap(), Some(12.5));
        assert_eq!(parse_elevation_body(r#"{"elevation": "3.2"}"#).unwrap(), Some(3.2));
    }

    #[test]
    fn sentinel_and_null_are_no_data() {
        assert_eq!(parse_elevation_body(r#"{"elevation": "-----", "hsrc": "-----"}"#).unwrap(), None);
        assert_eq!(parse_elevation_body(r#"{"elevation": null}"#).unwrap(), None);
        assert_eq!(parse_elevation_body(r#"{}"#).unwrap(), None);
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(parse_elevation_body("<html>"), Err(EngineError::Parse(_))));
        assert!(matches!(
            parse_elevation_body(r#"{"elevation": "abc"}"#),
            Err(EngineError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_lookup_skips_source() {
        let source = Arc::new(FakeElevation::constant(42.0));
        let resolver = resolver(source.clone());
        assert_eq!(resolver.get_elevation(&p(35.68121, 139.76712)).await, 42.0);
        // Same 4-decimal cell.
        assert_eq!(resolver.get_elevation(&p(35.68124, 139.76714)).await, 42.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_reads_as_sea_level_and_is_not_cached() {
        let source = Arc::new(FakeElevation::failing());
        let resolver = resolver(source.clone());
        assert_eq!(resolver.get_elevation(&p(35.0, 139.0)).await, 0.0);
        assert!(resolver.try_get_elevation(&p(35.0, 139.0)).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ocean_cell_reads_as_zero() {
        let ocean = p(35.0, 140.5);
        let source = Arc::new(FakeElevation::constant(10.0).with(&ocean, None));
        let resolver = resolver(source);
        assert_eq!(resolver.try_get_elevation(&ocean).await.unwrap(), None);
        assert_eq!(resolver.get_elevation(&ocean).await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_is_rate_limited_and_keyed() {
        let source = Arc::new(FakeElevation::constant(5.0));
        let resolver = resolver(source);
        let points = [p(35.1, 139.1), p(35.2, 139.2), p(35.3, 139.3)];
        let start = tokio::time::Instant::now();
        let results = resolver.get_elevations_batch(&points).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(results.len(), 3);
        assert_eq!(results.get("35.2,139.2"), Some(&5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn grid_is_square_and_centred() {
        let source = Arc::new(FakeElevation::constant(1.0));
        let resolver = resolver(source);
        let center = p(35.0, 139.0);
        let grid = resolver.get_grid_elevations(&center, 1.0, 3).await.unwrap();
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[4].0, center);
        assert!((grid[0].0.latitude - (35.0 - 1.0 / 111.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn grid_rejects_bad_spacing() {
        let resolver = resolver(Arc::new(FakeElevation::constant(1.0)));
        assert!(resolver.get_grid_elevations(&p(35.0, 139.0), 0.0, 3).await.is_err());
    }
}
