//! Hazard-map raster lookup: tile fetch, PNG decode, legend match.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use image::ImageFormat;
use reqwest::StatusCode;

use crate::cache::Cache;
use crate::errors::{EngineError, Result};
use crate::geo::round_to;
use crate::legend::{self, Rgb};
use crate::models::{GeoPoint, HazardDetail, HazardInfo, HazardLevel, HazardType};
use crate::outcome::Gathered;
use crate::tiles::{self, TileCoordinate};

pub const USER_AGENT: &str = concat!("hazard-engine/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_HAZARD_TYPES: [HazardType; 3] =
    [HazardType::Flood, HazardType::Tsunami, HazardType::HighTide];

/// Raster source addressed as `{dataset}/{zoom}/{x}/{y}.png`.
///
/// `Ok(None)` means the provider publishes no tile there, which the
/// hazard portal does for every area outside a mapped inundation zone.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch_tile(&self, dataset: &str, zoom: u8, x: u32, y: u32) -> Result<Option<Vec<u8>>>;
}

/// The hazard portal's tile server only negotiates legacy protocol
/// versions, so this client alone accepts TLS 1.0 and up.
pub struct HttpTileSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTileSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let tls = native_tls::TlsConnector::builder()
            .min_protocol_version(Some(native_tls::Protocol::Tlsv10))
            .build()
            .map_err(|err| EngineError::Configuration(format!("legacy TLS connector: {err}")))?;

        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| EngineError::Configuration(format!("tile HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch_tile(&self, dataset: &str, zoom: u8, x: u32, y: u32) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/{dataset}/{zoom}/{x}/{y}.png", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

pub fn dataset_for(hazard_type: HazardType) -> Result<&'static str> {
    match hazard_type {
        HazardType::Flood => Ok("01_flood_l2_shinsuishin_data"),
        HazardType::InternalFlood => Ok("02_naisui_data"),
        HazardType::HighTide => Ok("03_hightide_l2_shinsuishin_data"),
        HazardType::Tsunami => Ok("04_tsunami_newlegend_data"),
        HazardType::Landslide | HazardType::Avalanche => Err(EngineError::no_dataset(hazard_type)),
    }
}

/// Colour at the sampled pixel, `None` for transparent or pure white.
pub fn sample_pixel(png: &[u8], pixel_x: f64, pixel_y: f64) -> Result<Option<Rgb>> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EngineError::Decode("empty raster tile".into()));
    }
    let x = (pixel_x.max(0.0).floor() as u32).min(width - 1);
    let y = (pixel_y.max(0.0).floor() as u32).min(height - 1);
    let [r, g, b, a] = image.get_pixel(x, y).0;
    if a == 0 || (r, g, b) == (255, 255, 255) {
        return Ok(None);
    }
    Ok(Some([r, g, b]))
}

fn describe(hazard_type: HazardType, level: HazardLevel, depth_meters: f64) -> String {
    let what = match hazard_type {
        HazardType::Tsunami => "Tsunami inundation",
        HazardType::Flood => "River flood inundation",
        HazardType::HighTide => "Storm-surge inundation",
        HazardType::InternalFlood => "Inland flooding",
        HazardType::Landslide => "Landslide",
        HazardType::Avalanche => "Avalanche",
    };
    format!("{what} up to {depth_meters:.1} m expected ({level} risk)")
}

pub struct HazardMapService {
    tiles: Arc<dyn TileSource>,
    cache: Cache<String, HazardInfo>,
    default_zoom: u8,
}

impl HazardMapService {
    pub fn new(tiles: Arc<dyn TileSource>, cache: Cache<String, HazardInfo>, default_zoom: u8) -> Self {
        Self {
            tiles,
            cache,
            default_zoom,
        }
    }

    pub fn cache_key(point: &GeoPoint, zoom: u8, hazard_types: &[HazardType]) -> String {
        let types: Vec<&str> = hazard_types.iter().map(|t| t.as_str()).collect();
        format!(
            "hazard:{:.3}:{:.3}:{zoom}:{}",
            round_to(point.latitude, 3),
            round_to(point.longitude, 3),
            types.join(",")
        )
    }

    /// Looks up each requested hazard type concurrently. A type that fails
    /// is logged and reported in `HazardInfo::unavailable`; the call only
    /// fails for an invalid zoom.
    pub async fn get_hazard_info(
        &self,
        point: &GeoPoint,
        hazard_types: &[HazardType],
        zoom: Option<u8>,
    ) -> Result<HazardInfo> {
        let zoom = zoom.unwrap_or(self.default_zoom);
        let tile = tiles::tile_coordinate(point, zoom)?;

        let mut requested: Vec<HazardType> = if hazard_types.is_empty() {
            DEFAULT_HAZARD_TYPES.to_vec()
        } else {
            hazard_types.to_vec()
        };
        requested.sort();
        requested.dedup();

        let cache_key = Self::cache_key(point, zoom, &requested);
        if let Some(hit) = self.cache.get(&cache_key) {
            log::debug!("Hazard cache hit {cache_key}");
            return Ok(hit);
        }

        let lookups = requested
            .iter()
            .map(|&hazard_type| async move { (hazard_type, self.lookup(hazard_type, &tile).await) });
        let gathered = Gathered::from_results(join_all(lookups).await);
        gathered.log_failures("hazard-map", &cache_key);

        let transient_failure = gathered
            .failures
            .iter()
            .any(|(_, err)| !matches!(err, EngineError::Configuration(_)));
        let unavailable: Vec<HazardType> = gathered.failed_keys().copied().collect();
        let hazards: Vec<HazardDetail> = gathered.values.into_iter().flatten().collect();

        let info = HazardInfo::new(*point, hazards, tile, cache_key.clone(), unavailable);
        if transient_failure {
            log::warn!(
                "Hazard lookup {cache_key} incomplete ({} unavailable), not caching",
                info.unavailable.len()
            );
        } else {
            self.cache.insert(cache_key, info.clone());
        }
        Ok(info)
    }

    async fn lookup(&self, hazard_type: HazardType, tile: &TileCoordinate) -> Result<Option<HazardDetail>> {
        let dataset = dataset_for(hazard_type)?;
        let legend = legend::legend_for(hazard_type).ok_or_else(|| EngineError::no_dataset(hazard_type))?;

        let Some(png) = self.tiles.fetch_tile(dataset, tile.zoom, tile.x, tile.y).await? else {
            return Ok(None);
        };
        let Some(rgb) = sample_pixel(&png, tile.pixel_x, tile.pixel_y)? else {
            return Ok(None);
        };
        let Some(depth) = legend::match_depth(legend, rgb) else {
            log::debug!("{hazard_type}: pixel {rgb:?} matches no legend colour");
            return Ok(None);
        };

        let level = legend::level_for_depth(hazard_type, depth);
        Ok(Some(HazardDetail {
            hazard_type,
            level,
            depth_meters: Some(depth),
            description: describe(hazard_type, level, depth),
            source: format!("GSI hazard map ({dataset})"),
            updated_at: Utc::now(),
        }))
    }
}
