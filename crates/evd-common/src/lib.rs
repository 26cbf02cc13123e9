//! ---
//! evd_section: "01-core-functionality"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Shared primitives and utilities for the dispatch runtime."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! Shared primitives for the EVD-Sim workspace: configuration loading,
//! tracing initialisation, and small time/number helpers used throughout
//! the simulation crates.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    EnergyConfig, FleetConfig, LoggingConfig, SimConfig, StationConfig, TransportConfig, TruckSpec,
};
pub use logging::{init_tracing, LogFormat};
pub use time::{drive_minutes, round2};
