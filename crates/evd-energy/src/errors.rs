//! ---
//! evd_section: "04-energy-model"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "SOC energy cost model and consumption calibration."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnergyError>;

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("battery capacity must be positive, got {0} kWh")]
    InvalidCapacity(f64),
    #[error("distance must be finite and non-negative, got {0} km")]
    InvalidDistance(f64),
    #[error("route segment is unknown, no cost can be derived")]
    UnknownSegment,
}
