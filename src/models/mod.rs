pub mod hazard;
pub mod point;
pub mod risk;
pub mod shelter;
pub mod warning;

pub use hazard::{HazardDetail, HazardInfo, HazardLevel, HazardType};
pub use point::GeoPoint;
pub use risk::{DataSource, RiskAssessment, RiskLevel};
pub use shelter::{DisasterType, RouteSafety, SafeShelterResult, ShelterCandidate};
pub use warning::{WarningInfo, WarningSeverity};
