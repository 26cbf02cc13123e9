//! ---
//! evd_section: "03-telemetry"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Telemetry feed traits and frame types."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use chrono::Duration;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::frames::TelemetryFrame;

/// Source of truck telemetry.
///
/// `Send + Sync` so a live deployment can share one feed between the
/// classifier and a reporting surface; the simulation uses the in-memory
/// implementation below.
pub trait TelemetryFeed: Send + Sync {
    /// Most recent frame for the truck, if any has been reported.
    fn current(&self, truck_id: &str) -> Option<TelemetryFrame>;

    /// Frames for the truck inside the trailing window, oldest first.
    fn history(&self, truck_id: &str, window_minutes: i64) -> Vec<TelemetryFrame>;
}

/// Persistence for learned per-truck consumption rates, keyed by load state.
pub trait ConsumptionStore: Send + Sync {
    fn get(&self, truck_id: &str, loaded: bool) -> Option<f64>;
    fn put(&self, truck_id: &str, loaded: bool, rate_kwh_per_km: f64);
}

/// In-memory telemetry feed used by the simulation and tests.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    frames: RwLock<IndexMap<String, Vec<TelemetryFrame>>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame, keeping per-truck frames sorted by report time.
    pub fn push(&self, frame: TelemetryFrame) {
        let mut frames = self.frames.write();
        let track = frames.entry(frame.truck_id.clone()).or_default();
        match track.last() {
            Some(last) if last.report_time > frame.report_time => {
                let at = track
                    .partition_point(|f| f.report_time <= frame.report_time);
                track.insert(at, frame);
            }
            _ => track.push(frame),
        }
    }

    pub fn push_all(&self, frames: impl IntoIterator<Item = TelemetryFrame>) {
        for frame in frames {
            self.push(frame);
        }
    }
}

impl TelemetryFeed for MemoryFeed {
    fn current(&self, truck_id: &str) -> Option<TelemetryFrame> {
        self.frames.read().get(truck_id).and_then(|t| t.last().cloned())
    }

    fn history(&self, truck_id: &str, window_minutes: i64) -> Vec<TelemetryFrame> {
        let frames = self.frames.read();
        let Some(track) = frames.get(truck_id) else {
            return Vec::new();
        };
        let Some(latest) = track.last() else {
            return Vec::new();
        };
        let cutoff = latest.report_time - Duration::minutes(window_minutes);
        track
            .iter()
            .filter(|f| f.report_time >= cutoff)
            .cloned()
            .collect()
    }
}

/// In-memory consumption-rate store.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    rates: RwLock<IndexMap<(String, bool), f64>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsumptionStore for MemoryRateStore {
    fn get(&self, truck_id: &str, loaded: bool) -> Option<f64> {
        self.rates.read().get(&(truck_id.to_owned(), loaded)).copied()
    }

    fn put(&self, truck_id: &str, loaded: bool, rate_kwh_per_km: f64) {
        debug!(truck = truck_id, loaded, rate = rate_kwh_per_km, "consumption rate updated");
        self.rates
            .write()
            .insert((truck_id.to_owned(), loaded), rate_kwh_per_km);
    }
}
