//! ---
//! evd_section: "06-swap-station"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Battery pool and swap station resource manager."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One completed battery exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub truck_id: String,
    /// Truck SOC at the moment of the swap.
    pub soc: f64,
    pub capacity_kwh: f64,
    pub await_start: DateTime<Utc>,
    pub swap_start: DateTime<Utc>,
    /// When the depleted pack went on the charger, i.e. swap end.
    pub battery_available_since: DateTime<Utc>,
    pub charge_duration_minutes: i64,
    /// When the pack taken in is full again,
    /// `battery_available_since + charge_duration_minutes`.
    pub battery_full_at: DateTime<Utc>,
    pub battery_slot: String,
    /// The truck's trip counter at swap time, used to associate the record
    /// with a schedule leg.
    pub trips: u32,
}

impl ExchangeRecord {
    /// Enforce `await ≤ swap_start ≤ available_since ≤ full` by pushing the
    /// later timestamp forward. Rounding in upstream clock arithmetic can
    /// leave these a hair out of order.
    pub fn clamp_timestamps(&mut self) {
        if self.swap_start < self.await_start {
            self.swap_start = self.await_start;
        }
        if self.battery_available_since < self.swap_start {
            self.battery_available_since = self.swap_start;
        }
        if self.battery_full_at < self.battery_available_since {
            self.battery_full_at =
                self.battery_available_since + Duration::minutes(self.charge_duration_minutes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clamping_restores_timestamp_order() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut record = ExchangeRecord {
            truck_id: "t1".into(),
            soc: 18.5,
            capacity_kwh: 282.0,
            await_start: t0,
            swap_start: t0 - Duration::minutes(1),
            battery_available_since: t0 - Duration::minutes(3),
            charge_duration_minutes: 49,
            battery_full_at: t0 - Duration::minutes(10),
            battery_slot: "no2".into(),
            trips: 3,
        };
        record.clamp_timestamps();
        assert!(record.await_start <= record.swap_start);
        assert!(record.swap_start <= record.battery_available_since);
        assert!(record.battery_available_since <= record.battery_full_at);
        assert_eq!(
            record.battery_full_at,
            record.battery_available_since + Duration::minutes(49)
        );
    }
}
