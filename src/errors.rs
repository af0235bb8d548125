use std::fmt;

use crate::models::HazardType;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure of a single external fetch or lookup.
///
/// None of these escape `get_hazard_info`, `assess_risk` or
/// `filter_safe_shelters`; they are logged at the point of failure and the
/// affected sub-result is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Network(String),
    Decode(String),
    Parse(String),
    Configuration(String),
    Validation(String),
}

impl EngineError {
    pub fn no_dataset(hazard_type: HazardType) -> Self {
        Self::Configuration(format!("no raster dataset for hazard type {hazard_type}"))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Parse(_) => "parse",
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Parse(err.to_string());
        }
        let msg = match err.status() {
            Some(status) => format!("HTTP {status} from {}", url_of(&err)),
            None if err.is_timeout() => format!("timeout fetching {}", url_of(&err)),
            None => err.to_string(),
        };
        Self::Network(msg)
    }
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<quick_xml::DeError> for EngineError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

fn url_of(err: &reqwest::Error) -> String {
    err.url().map(|u| u.to_string()).unwrap_or_else(|| "<unknown url>".into())
}
