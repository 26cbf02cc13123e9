//! ---
//! evd_section: "04-energy-model"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "SOC energy cost model and consumption calibration."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! SOC cost model for the fleet. Costs are expressed in percentage points of
//! pack capacity; a learned per-truck consumption rate is preferred when the
//! store has one, falling back to the parametric model otherwise.

pub mod calibration;
pub mod errors;
pub mod model;

pub use calibration::Calibrator;
pub use errors::{EnergyError, Result};
pub use model::EnergyModel;
