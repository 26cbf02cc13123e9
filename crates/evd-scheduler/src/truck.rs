//! ---
//! evd_section: "07-dispatch-scheduler"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Discrete-event fleet dispatch simulation."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use evd_common::config::TruckSpec;
use evd_common::round2;
use evd_station::SwapRequest;
use serde::{Deserialize, Serialize};

/// Simulated state of one truck.
///
/// `soc` is kept at two decimals after every mutation, matching the
/// resolution of the telemetry it is seeded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Truck {
    pub id: String,
    pub soc: f64,
    pub capacity_kwh: f64,
    /// Completed delivery runs, incremented when the laden leg starts.
    pub trips: u32,
}

impl Truck {
    pub fn from_spec(spec: &TruckSpec) -> Self {
        Self {
            id: spec.id.clone(),
            soc: round2(spec.soc),
            capacity_kwh: spec.capacity_kwh,
            trips: 0,
        }
    }

    /// Subtract a SOC cost, floored at zero.
    pub fn drain(&mut self, cost: f64) {
        self.soc = round2((self.soc - cost).max(0.0));
    }

    /// A fresh pack was fitted and `cost` was spent leaving the station.
    pub fn leave_station(&mut self, cost: f64) {
        self.soc = round2((100.0 - cost).max(0.0));
    }

    pub fn swap_request(&self) -> SwapRequest {
        SwapRequest {
            truck_id: self.id.clone(),
            soc: self.soc,
            capacity_kwh: self.capacity_kwh,
            trips: self.trips,
        }
    }
}
