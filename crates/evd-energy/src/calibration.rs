//! ---
//! evd_section: "04-energy-model"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "SOC energy cost model and consumption calibration."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use std::sync::Arc;

use evd_common::round2;
use evd_geo::RouteSegment;
use evd_telemetry::{ConsumptionStore, TelemetryFeed};
use tracing::{debug, warn};

/// History window inspected for a calibration pass.
const WINDOW_MINUTES: i64 = 30;
/// Minimum samples carrying both counters before a rate is trusted.
const MIN_SAMPLES: usize = 50;
/// Counter deltas above these bounds indicate a reset mid-window.
const MAX_KM_DELTA: f64 = 500.0;
const MAX_KWH_DELTA: f64 = 700.0;
/// Plausible per-km consumption for this truck class.
const RATE_MIN: f64 = 0.5;
const RATE_MAX: f64 = 5.0;
/// An existing rate is only replaced once the leg is well underway.
const PROGRESS_GATE: f64 = 0.35;

/// Learns per-truck consumption rates from odometer and energy counters.
pub struct Calibrator {
    feed: Arc<dyn TelemetryFeed>,
    store: Arc<dyn ConsumptionStore>,
}

impl Calibrator {
    pub fn new(feed: Arc<dyn TelemetryFeed>, store: Arc<dyn ConsumptionStore>) -> Self {
        Self { feed, store }
    }

    /// Opportunistic calibration hook run after each route classification.
    ///
    /// The load state is taken from the classified segment: only the plain
    /// delivery run counts as laden for rate bookkeeping.
    pub fn update_from_route(&self, truck_id: &str, segment: RouteSegment, progress: f64) {
        let loaded = segment == RouteSegment::LoadingToUnloading;
        self.update(truck_id, loaded, progress);
    }

    /// Recompute the average kWh/km over the trailing window and store it
    /// when every validity gate passes.
    pub fn update(&self, truck_id: &str, loaded: bool, progress: f64) {
        let history = self.feed.history(truck_id, WINDOW_MINUTES);
        let samples: Vec<_> = history
            .iter()
            .filter(|f| f.odometer_km.is_some() && f.cumulative_energy_kwh.is_some())
            .collect();
        if samples.len() < MIN_SAMPLES {
            debug!(
                truck = truck_id,
                samples = samples.len(),
                "too few counter samples for calibration"
            );
            return;
        }

        let first = samples[0];
        let last = samples[samples.len() - 1];
        let km_delta = last.odometer_km.unwrap_or(0.0) - first.odometer_km.unwrap_or(0.0);
        let kwh_delta =
            last.cumulative_energy_kwh.unwrap_or(0.0) - first.cumulative_energy_kwh.unwrap_or(0.0);

        if km_delta <= 0.0 || kwh_delta <= 0.0 {
            warn!(truck = truck_id, km_delta, kwh_delta, "non-positive counter delta");
            return;
        }
        if km_delta > MAX_KM_DELTA || kwh_delta > MAX_KWH_DELTA {
            warn!(truck = truck_id, km_delta, kwh_delta, "counter delta out of bounds");
            return;
        }

        let rate = round4(kwh_delta / km_delta);
        if !(RATE_MIN..=RATE_MAX).contains(&rate) {
            warn!(truck = truck_id, rate, "rate outside plausible band");
            return;
        }

        let existing = self.store.get(truck_id, loaded);
        if existing.is_some() && progress <= PROGRESS_GATE {
            debug!(
                truck = truck_id,
                progress = round2(progress),
                "keeping existing rate, leg not far enough along"
            );
            return;
        }

        self.store.put(truck_id, loaded, rate);
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
