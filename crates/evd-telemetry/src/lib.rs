//! ---
//! evd_section: "03-telemetry"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Telemetry feed traits and frame types."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! Telemetry for the fleet: the reported frame type, the `TelemetryFeed` and
//! `ConsumptionStore` collaborator traits, in-memory implementations backing
//! the simulation, and a deterministic synthetic track generator for tests.

pub mod feed;
pub mod frames;
pub mod generator;

pub use feed::{ConsumptionStore, MemoryFeed, MemoryRateStore, TelemetryFeed};
pub use frames::TelemetryFrame;
pub use generator::{DriveProfile, TrackGenerator};
