//! Location-based disaster safety engine: hazard-map raster decoding, live
//! warning aggregation, risk fusion and shelter safety scoring.

pub mod areas;
pub mod cache;
pub mod config;
pub mod elevation;
pub mod engine;
pub mod errors;
pub mod geo;
pub mod hazard;
pub mod jma;
pub mod legend;
pub mod models;
pub mod outcome;
pub mod rate_limit;
pub mod risk;
pub mod shelters;
pub mod tiles;
pub mod validation;
pub mod warnings;

pub use config::Config;
pub use engine::{Engine, Sources};
pub use errors::{EngineError, Result};
