//! ---
//! evd_section: "03-telemetry"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Telemetry feed traits and frame types."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use chrono::{DateTime, Utc};
use evd_geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// One reported telemetry sample for a truck.
///
/// Fields beyond position and time are optional: older onboard units omit
/// the odometer and energy counters, and consumers must cope with their
/// absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub truck_id: String,
    pub report_time: DateTime<Utc>,
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    /// Lifetime odometer reading, kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odometer_km: Option<f64>,
    /// State of charge, percent of pack capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc: Option<f64>,
    /// Lifetime cumulative energy drawn from the pack, kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_energy_kwh: Option<f64>,
}

impl TelemetryFrame {
    pub fn new(truck_id: impl Into<String>, report_time: DateTime<Utc>, position: GeoPoint) -> Self {
        Self {
            truck_id: truck_id.into(),
            report_time,
            position,
            speed_kmh: None,
            odometer_km: None,
            soc: None,
            cumulative_energy_kwh: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn optional_counters_round_trip_as_absent() {
        let frame = TelemetryFrame::new(
            "truck-01",
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            GeoPoint::new(21.36, 110.05),
        );
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("odometer_km").is_none());
        assert!(json.get("soc").is_none());
        let back: TelemetryFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }
}
