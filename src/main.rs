use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;
use serde::Serialize;

use hazard_engine::models::{DisasterType, GeoPoint, HazardType, ShelterCandidate};
use hazard_engine::shelters::{ShelterQuery, DEFAULT_MAX_RESULTS};
use hazard_engine::{Config, Engine, EngineError, Result};

#[derive(Parser)]
#[command(name = "hazard-engine", version, about = "Disaster hazard, risk and shelter lookups")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode hazard-map rasters at a point
    Hazard {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        zoom: Option<u8>,
        /// Comma-separated, e.g. flood,tsunami
        #[arg(long, value_delimiter = ',', value_parser = parse_hazard_type)]
        types: Vec<HazardType>,
    },
    /// Fused risk assessment
    Risk {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Area code lookup
    Area {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Active warnings for the area, or every area within a radius
    Warnings {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Rank shelters from a JSON file for a disaster at the given point
    Shelters {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "tsunami")]
        disaster: String,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
        #[arg(long)]
        emergency: bool,
    },
    /// Route safety over a JSON array of points
    Route {
        #[arg(long)]
        file: String,
    },
    /// Fill elevation and hazard caches around a point
    Prewarm {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = 1.0)]
        spacing_km: f64,
        #[arg(long, default_value_t = 5)]
        grid: usize,
    },
}

fn parse_hazard_type(name: &str) -> std::result::Result<HazardType, String> {
    HazardType::parse(name).ok_or_else(|| format!("unknown hazard type {name:?}"))
}

#[derive(Serialize)]
struct AreaPayload {
    area_code: Option<String>,
    area_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nearby: Option<Vec<String>>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|err| EngineError::Configuration(format!("cannot read {path}: {err}")))?;
    Ok(serde_json::from_str(&raw)?)
}

async fn run(engine: Engine, command: Command) -> Result<()> {
    match command {
        Command::Hazard { lat, lon, zoom, types } => {
            let point = GeoPoint::new(lat, lon)?;
            print_json(&engine.hazards.get_hazard_info(&point, &types, zoom).await?)
        }
        Command::Risk { lat, lon } => {
            let point = GeoPoint::new(lat, lon)?;
            print_json(&engine.risk.assess_risk(&point).await)
        }
        Command::Area { lat, lon, radius_km } => {
            let point = GeoPoint::new(lat, lon)?;
            let area_code = engine.areas.area_code_for(&point);
            let area_name = area_code
                .as_deref()
                .and_then(|code| engine.areas.area_name(code))
                .map(str::to_string);
            let nearby = radius_km
                .map(|radius| engine.areas.nearby_area_codes(&point, radius))
                .transpose()?;
            print_json(&AreaPayload {
                area_code,
                area_name,
                nearby,
            })
        }
        Command::Warnings { lat, lon, radius_km } => {
            let point = GeoPoint::new(lat, lon)?;
            let warnings = match radius_km {
                Some(radius) => engine.warnings.get_warnings_near(&point, radius).await?,
                None => engine.warnings.get_warnings_for_location(&point).await?,
            };
            print_json(&warnings)
        }
        Command::Shelters {
            lat,
            lon,
            file,
            disaster,
            max_results,
            emergency,
        } => {
            let point = GeoPoint::new(lat, lon)?;
            let candidates: Vec<ShelterCandidate> = read_json(&file)?;
            let disaster_type = DisasterType::parse(&disaster);
            let hazard_types: Vec<HazardType> = disaster_type.hazard_type().into_iter().collect();
            let hazard_info = engine.hazards.get_hazard_info(&point, &hazard_types, None).await?;
            let query = ShelterQuery::new(disaster_type)
                .near(point)
                .limit(max_results)
                .emergency(emergency);
            print_json(
                &engine
                    .shelters
                    .filter_safe_shelters(&candidates, &hazard_info, &query)
                    .await,
            )
        }
        Command::Route { file } => {
            let route: Vec<GeoPoint> = read_json(&file)?;
            for point in &route {
                GeoPoint::new(point.latitude, point.longitude)?;
            }
            print_json(&engine.route_safety(&route).await?)
        }
        Command::Prewarm {
            lat,
            lon,
            spacing_km,
            grid,
        } => {
            let point = GeoPoint::new(lat, lon)?;
            print_json(&engine.prewarm(&point, spacing_km, grid).await?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let cli = Cli::parse();
    let cfg = Config::from_env();

    let engine = match Engine::from_config(&cfg) {
        Ok(engine) => engine,
        Err(err) => {
            log::error!("Failed to start engine: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(engine, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{} error: {err}", err.kind());
            ExitCode::FAILURE
        }
    }
}
