//! Wires every component from one [`Config`].

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::areas::AreaCodeMapper;
use crate::cache::Cache;
use crate::config::Config;
use crate::elevation::{ElevationResolver, ElevationSource, GsiElevationSource};
use crate::errors::Result;
use crate::hazard::{HazardMapService, HttpTileSource, TileSource};
use crate::models::{GeoPoint, HazardInfo, RouteSafety};
use crate::rate_limit::RateLimiter;
use crate::risk::RiskAssessor;
use crate::shelters::{self, ShelterSafetyFilter};
use crate::warnings::{FeedSource, HttpFeedSource, WarningAggregator};

/// Upstream clients the engine talks through.
pub struct Sources {
    pub tiles: Arc<dyn TileSource>,
    pub elevation: Arc<dyn ElevationSource>,
    pub feed: Arc<dyn FeedSource>,
}

impl Sources {
    pub fn http(config: &Config) -> Result<Self> {
        Ok(Self {
            tiles: Arc::new(HttpTileSource::new(&config.tile_base_url, config.tile_timeout)?),
            elevation: Arc::new(GsiElevationSource::new(
                &config.elevation_endpoint,
                config.elevation_timeout,
            )?),
            feed: Arc::new(HttpFeedSource::new(config.feed_timeout)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrewarmSummary {
    pub cells: usize,
    pub hazard_incomplete: usize,
}

pub struct Engine {
    pub areas: Arc<AreaCodeMapper>,
    pub hazards: Arc<HazardMapService>,
    pub warnings: Arc<WarningAggregator>,
    pub elevation: Arc<ElevationResolver>,
    pub risk: RiskAssessor,
    pub shelters: ShelterSafetyFilter,
}

impl Engine {
    /// HTTP sources and the area table named by the config, or the bundled one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let areas = match &config.area_table_path {
            Some(path) => AreaCodeMapper::from_path(path)?,
            None => AreaCodeMapper::bundled()?,
        };
        Ok(Self::with_sources(config, Sources::http(config)?, areas))
    }

    pub fn with_sources(config: &Config, sources: Sources, areas: AreaCodeMapper) -> Self {
        let areas = Arc::new(areas);
        let hazards = Arc::new(HazardMapService::new(
            sources.tiles,
            Cache::new(config.hazard_ttl),
            config.default_zoom,
        ));
        let warnings = Arc::new(WarningAggregator::new(
            sources.feed,
            &config.warning_feed_url,
            config.max_warning_entries,
            areas.clone(),
            Cache::new(config.warning_ttl),
        ));
        let elevation = Arc::new(ElevationResolver::new(
            sources.elevation,
            RateLimiter::new(config.elevation_min_interval),
            Cache::new(config.elevation_ttl),
        ));
        let risk = RiskAssessor::new(
            hazards.clone(),
            warnings.clone(),
            elevation.clone(),
            Cache::new(config.risk_ttl),
        );
        let shelters = ShelterSafetyFilter::new(elevation.clone());

        Self {
            areas,
            hazards,
            warnings,
            elevation,
            risk,
            shelters,
        }
    }

    /// Hazard info for each route point with the default types, then the
    /// worst-level classification.
    pub async fn route_safety(&self, route: &[GeoPoint]) -> Result<RouteSafety> {
        let infos: Vec<HazardInfo> = join_all(
            route
                .iter()
                .map(|point| self.hazards.get_hazard_info(point, &[], None)),
        )
        .await
        .into_iter()
        .collect::<Result<_>>()?;
        Ok(shelters::evaluate_route_safety(&infos))
    }

    /// Fills the elevation and hazard caches on a square grid around `center`.
    pub async fn prewarm(&self, center: &GeoPoint, spacing_km: f64, grid_points: usize) -> Result<PrewarmSummary> {
        let grid = self
            .elevation
            .get_grid_elevations(center, spacing_km, grid_points)
            .await?;
        let lookups = join_all(
            grid.iter()
                .map(|(point, _)| self.hazards.get_hazard_info(point, &[], None)),
        )
        .await;

        let mut hazard_incomplete = 0;
        for lookup in lookups {
            match lookup {
                Ok(info) if info.is_complete() => {}
                Ok(_) => hazard_incomplete += 1,
                Err(err) => {
                    log::warn!("Prewarm hazard lookup failed: {err}");
                    hazard_incomplete += 1;
                }
            }
        }
        if hazard_incomplete > 0 {
            log::warn!(
                "Prewarm around {}: {hazard_incomplete} of {} hazard lookups incomplete",
                center.key(4),
                grid.len()
            );
        }
        Ok(PrewarmSummary {
            cells: grid.len(),
            hazard_incomplete,
        })
    }
}
