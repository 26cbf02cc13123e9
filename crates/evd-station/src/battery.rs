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
use evd_common::round2;
use serde::{Deserialize, Serialize};

/// One battery slot in the station pool.
///
/// Invariant: a battery that is not charging is full; a charging battery
/// carries the time its charge completes. Slots are created once and reused
/// for the life of the station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    position_no: String,
    soc: f64,
    charging: bool,
    charge_complete_at: DateTime<Utc>,
}

impl Battery {
    /// A fresh full battery; `epoch` is a time safely in the past so the
    /// slot reads as immediately available.
    pub fn new(position_no: impl Into<String>, epoch: DateTime<Utc>) -> Self {
        Self {
            position_no: position_no.into(),
            soc: 100.0,
            charging: false,
            charge_complete_at: epoch,
        }
    }

    pub fn position_no(&self) -> &str {
        &self.position_no
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    pub fn charging(&self) -> bool {
        self.charging
    }

    pub fn charge_complete_at(&self) -> DateTime<Utc> {
        self.charge_complete_at
    }

    /// Whether the battery can be handed out at `time`.
    pub fn available_at(&self, time: DateTime<Utc>) -> bool {
        (!self.charging && self.soc >= 100.0) || self.charge_complete_at <= time
    }

    /// Take in a depleted pack and put it on the charger.
    pub fn start_charging(
        &mut self,
        soc: f64,
        start: DateTime<Utc>,
        capacity_kwh: f64,
        rate_kwh_per_min: f64,
    ) {
        self.soc = round2(soc);
        self.charging = true;
        let minutes = charge_duration_minutes(soc, capacity_kwh, rate_kwh_per_min);
        self.charge_complete_at = start + Duration::minutes(minutes);
    }
}

/// Minutes to bring a pack from `soc` to full at the given charger rate,
/// rounded up to whole minutes.
pub fn charge_duration_minutes(soc: f64, capacity_kwh: f64, rate_kwh_per_min: f64) -> i64 {
    if rate_kwh_per_min <= 0.0 {
        return 0;
    }
    let deficit = (100.0 - soc).max(0.0);
    let kwh_per_point = round2(capacity_kwh / 100.0);
    round2(deficit * kwh_per_point / rate_kwh_per_min).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap()
    }

    #[test]
    fn fresh_battery_is_available() {
        let battery = Battery::new("no1", epoch());
        assert!(battery.available_at(epoch()));
        assert!(!battery.charging());
        assert_eq!(battery.soc(), 100.0);
    }

    #[test]
    fn charging_battery_becomes_available_at_completion() {
        let mut battery = Battery::new("no1", epoch());
        let start = epoch() + Duration::hours(1);
        battery.start_charging(20.0, start, 282.0, 4.7);

        // (100 - 20) * 2.82 / 4.7 = 48 minutes exactly.
        assert_eq!(battery.charge_complete_at(), start + Duration::minutes(48));
        assert!(!battery.available_at(start + Duration::minutes(47)));
        assert!(battery.available_at(start + Duration::minutes(48)));
    }

    #[test]
    fn charge_duration_rounds_up() {
        assert_eq!(charge_duration_minutes(20.0, 282.0, 4.7), 48);
        assert_eq!(charge_duration_minutes(82.0, 282.0, 4.7), 11); // 10.8 -> 11
        assert_eq!(charge_duration_minutes(100.0, 282.0, 4.7), 0);
        assert_eq!(charge_duration_minutes(50.0, 282.0, 0.0), 0);
    }
}
