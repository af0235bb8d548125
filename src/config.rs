use std::env;
use std::time::Duration;

pub const DEFAULT_TILE_BASE_URL: &str = "https://disaportaldata.gsi.go.jp/raster";
pub const DEFAULT_ELEVATION_ENDPOINT: &str =
    "https://cyberjapandata2.gsi.go.jp/general/dem/scripts/getelevation.php";
pub const DEFAULT_WARNING_FEED_URL: &str =
    "https://www.data.jma.go.jp/developer/xml/feed/extra.xml";

const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub tile_base_url: String,
    pub elevation_endpoint: String,
    pub warning_feed_url: String,
    pub area_table_path: Option<String>,
    pub default_zoom: u8,
    pub tile_timeout: Duration,
    pub elevation_timeout: Duration,
    pub feed_timeout: Duration,
    pub hazard_ttl: Duration,
    pub elevation_ttl: Duration,
    pub warning_ttl: Duration,
    pub risk_ttl: Duration,
    pub elevation_min_interval: Duration,
    pub max_warning_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_base_url: DEFAULT_TILE_BASE_URL.into(),
            elevation_endpoint: DEFAULT_ELEVATION_ENDPOINT.into(),
            warning_feed_url: DEFAULT_WARNING_FEED_URL.into(),
            area_table_path: None,
            default_zoom: 16,
            tile_timeout: Duration::from_secs(30),
            elevation_timeout: Duration::from_secs(10),
            feed_timeout: Duration::from_secs(30),
            hazard_ttl: Duration::from_secs(30 * DAY_SECS),
            elevation_ttl: Duration::from_secs(30 * DAY_SECS),
            warning_ttl: Duration::from_secs(5 * 60),
            risk_ttl: Duration::from_secs(5 * 60),
            elevation_min_interval: Duration::from_secs(1),
            max_warning_entries: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tile_base_url: env::var("HAZARD_TILE_BASE_URL").unwrap_or(defaults.tile_base_url),
            elevation_endpoint: env::var("ELEVATION_ENDPOINT").unwrap_or(defaults.elevation_endpoint),
            warning_feed_url: env::var("WARNING_FEED_URL").unwrap_or(defaults.warning_feed_url),
            area_table_path: env::var("AREA_TABLE_PATH").ok().filter(|p| !p.is_empty()),
            default_zoom: env::var("HAZARD_ZOOM")
                .ok()
                .and_then(|z| z.parse().ok())
                .filter(|z| (2..=17).contains(z))
                .unwrap_or(defaults.default_zoom),
            tile_timeout: secs_from_env("TILE_TIMEOUT_SECS").unwrap_or(defaults.tile_timeout),
            elevation_timeout: secs_from_env("ELEVATION_TIMEOUT_SECS")
                .unwrap_or(defaults.elevation_timeout),
            feed_timeout: secs_from_env("FEED_TIMEOUT_SECS").unwrap_or(defaults.feed_timeout),
            hazard_ttl: secs_from_env("HAZARD_CACHE_TTL_SECS").unwrap_or(defaults.hazard_ttl),
            elevation_ttl: secs_from_env("ELEVATION_CACHE_TTL_SECS").unwrap_or(defaults.elevation_ttl),
            warning_ttl: secs_from_env("WARNING_CACHE_TTL_SECS").unwrap_or(defaults.warning_ttl),
            risk_ttl: secs_from_env("RISK_CACHE_TTL_SECS").unwrap_or(defaults.risk_ttl),
            elevation_min_interval: env::var("ELEVATION_MIN_INTERVAL_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.elevation_min_interval),
            max_warning_entries: env::var("MAX_WARNING_ENTRIES")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_warning_entries),
        }
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&s| s > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_ttls() {
        let cfg = Config::default();
        assert_eq!(cfg.hazard_ttl, Duration::from_secs(30 * DAY_SECS));
        assert_eq!(cfg.risk_ttl, Duration::from_secs(300));
        assert_eq!(cfg.elevation_min_interval, Duration::from_secs(1));
        assert_eq!(cfg.default_zoom, 16);
        assert_eq!(cfg.max_warning_entries, 5);
    }
}
