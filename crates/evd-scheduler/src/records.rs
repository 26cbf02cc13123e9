//! ---
//! evd_section: "07-dispatch-scheduler"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Discrete-event fleet dispatch simulation."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use chrono::{DateTime, Utc};
use evd_geo::SitePoint;
use evd_station::ExchangeRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_NORMAL: &str = "normal";
pub const STATUS_EXCHANGE: &str = "exchange";

/// One dispatch ledger entry: a single haul cycle of one truck.
///
/// Opened when the truck leaves the loading yard and closed when it is back;
/// a swap on the way home keeps the entry open until the truck returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: Uuid,
    pub truck_id: String,
    pub from: SitePoint,
    pub to: SitePoint,
    /// Calendar date of the shift, `YYYY-MM-DD`.
    pub schedule_date: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub needs_exchange: bool,
    pub status_icon: String,
    pub status_text: String,
    pub created_at: DateTime<Utc>,
    /// The swap performed during this cycle, when one was matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<ExchangeRecord>,
    /// Trip counter this cycle runs under, used to match exchange records.
    pub trips: u32,
}

impl ScheduleRecord {
    /// Open a ledger entry for the cycle departing at `start`.
    pub fn open(truck_id: &str, start: DateTime<Utc>, trips: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            truck_id: truck_id.to_owned(),
            from: SitePoint::Loading,
            to: SitePoint::Unloading,
            schedule_date: start.format("%Y-%m-%d").to_string(),
            start_time: start,
            end_time: start,
            needs_exchange: false,
            status_icon: STATUS_NORMAL.to_owned(),
            status_text: "normal haul".to_owned(),
            created_at: Utc::now(),
            exchange: None,
            trips,
        }
    }

    /// Close the entry. A missing exchange match keeps the flag set with no
    /// detail attached.
    pub fn close(
        &mut self,
        end: DateTime<Utc>,
        needs_exchange: bool,
        exchange: Option<ExchangeRecord>,
    ) {
        self.end_time = end;
        self.needs_exchange = needs_exchange;
        if needs_exchange {
            self.status_icon = STATUS_EXCHANGE.to_owned();
            self.status_text = if exchange.is_some() {
                "swap completed".to_owned()
            } else {
                "swap on return".to_owned()
            };
            self.exchange = exchange;
        } else {
            self.status_icon = STATUS_NORMAL.to_owned();
            self.status_text = "normal haul".to_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn closing_with_a_swap_updates_status_and_detail() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let mut record = ScheduleRecord::open("truck-01", t0, 3);
        assert_eq!(record.status_icon, STATUS_NORMAL);
        assert_eq!(record.schedule_date, "2025-03-01");

        let exchange = ExchangeRecord {
            truck_id: "truck-01".into(),
            soc: 21.4,
            capacity_kwh: 282.0,
            await_start: t0,
            swap_start: t0,
            battery_available_since: t0,
            charge_duration_minutes: 48,
            battery_full_at: t0 + Duration::minutes(48),
            battery_slot: "no1".into(),
            trips: 3,
        };
        record.close(t0 + Duration::minutes(82), true, Some(exchange));
        assert_eq!(record.status_icon, STATUS_EXCHANGE);
        assert_eq!(record.status_text, "swap completed");
        assert!(record.exchange.is_some());
    }

    #[test]
    fn unmatched_swap_keeps_the_flag_without_detail() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let mut record = ScheduleRecord::open("truck-01", t0, 1);
        record.close(t0 + Duration::minutes(90), true, None);
        assert!(record.needs_exchange);
        assert_eq!(record.status_text, "swap on return");
        assert!(record.exchange.is_none());
    }
}
