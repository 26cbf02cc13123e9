//! ---
//! evd_section: "06-swap-station"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Battery pool and swap station resource manager."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use evd_common::config::StationConfig;
use evd_common::round2;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::battery::{charge_duration_minutes, Battery};
use crate::records::ExchangeRecord;

/// Snapshot of a truck asking for a swap.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub truck_id: String,
    pub soc: f64,
    pub capacity_kwh: f64,
    pub trips: u32,
}

struct PendingSwap {
    request: SwapRequest,
    await_start: DateTime<Utc>,
}

/// The swap station: a fixed battery pool and a FIFO queue of trucks.
///
/// Physical swaps are serialized through `last_swap_end`; two trucks can
/// never occupy the swap bay at once. Entering the station never fails: when
/// no battery is ready the queue simply drains later.
pub struct SwapStation {
    slots: IndexMap<String, Battery>,
    queue: VecDeque<PendingSwap>,
    records: Vec<ExchangeRecord>,
    last_swap_end: DateTime<Utc>,
    exchanging: bool,
    exchange_minutes: i64,
    charge_rate_kwh_per_min: f64,
    battery_capacity_kwh: f64,
    base_kwh_per_km: f64,
}

impl SwapStation {
    /// `epoch` must predate the simulation start so the initial pool reads
    /// as available.
    pub fn new(config: &StationConfig, base_kwh_per_km: f64, epoch: DateTime<Utc>) -> Self {
        let mut slots = IndexMap::with_capacity(config.battery_count);
        for i in 1..=config.battery_count {
            let position = format!("no{i}");
            slots.insert(position.clone(), Battery::new(position, epoch));
        }
        Self {
            slots,
            queue: VecDeque::new(),
            records: Vec::new(),
            last_swap_end: epoch,
            exchanging: false,
            exchange_minutes: config.exchange_minutes,
            charge_rate_kwh_per_min: config.charge_rate_kwh_per_min,
            battery_capacity_kwh: config.battery_capacity_kwh,
            base_kwh_per_km,
        }
    }

    pub fn last_swap_end(&self) -> DateTime<Utc> {
        self.last_swap_end
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn has_available_battery(&self, time: DateTime<Utc>) -> bool {
        self.slots.values().any(|b| b.available_at(time))
    }

    /// A truck joins the queue; the queue is drained immediately unless a
    /// swap is already in progress.
    ///
    /// Returns the exchange record produced for this truck, when its swap
    /// resolved during this call.
    pub fn enter(&mut self, request: SwapRequest, time: DateTime<Utc>) -> Option<ExchangeRecord> {
        info!(
            truck = %request.truck_id,
            soc = request.soc,
            queue = self.queue.len(),
            "truck entered the swap station"
        );
        let truck_id = request.truck_id.clone();
        let trips = request.trips;
        self.queue.push_back(PendingSwap { request, await_start: time });
        if !self.exchanging {
            self.process_queue(time);
        }
        self.exchange_for(&truck_id, trips).cloned()
    }

    /// Drain the queue in FIFO order starting at `time`.
    ///
    /// When no battery is ready the clock advances to the earliest charge
    /// completion and availability is re-checked; an empty pool is the only
    /// condition that leaves trucks waiting.
    pub fn process_queue(&mut self, mut time: DateTime<Utc>) {
        if self.exchanging {
            return;
        }
        self.exchanging = true;

        while !self.queue.is_empty() {
            let Some(slot_key) = self.pick_battery(&mut time) else {
                break;
            };
            let pending = match self.queue.pop_front() {
                Some(p) => p,
                None => break,
            };
            let ready_at = self.slots[&slot_key].charge_complete_at();

            let mut swap_start = if time > self.last_swap_end { time } else { self.last_swap_end };
            if ready_at > swap_start {
                swap_start = ready_at;
            }
            let swap_end = swap_start + Duration::minutes(self.exchange_minutes);
            let duration = charge_duration_minutes(
                pending.request.soc,
                pending.request.capacity_kwh,
                self.charge_rate_kwh_per_min,
            );

            let record = ExchangeRecord {
                truck_id: pending.request.truck_id.clone(),
                soc: round2(pending.request.soc),
                capacity_kwh: pending.request.capacity_kwh,
                await_start: pending.await_start,
                swap_start,
                battery_available_since: swap_end,
                charge_duration_minutes: duration,
                battery_full_at: swap_end + Duration::minutes(duration),
                battery_slot: slot_key.clone(),
                trips: pending.request.trips,
            };
            debug!(
                truck = %record.truck_id,
                slot = %record.battery_slot,
                swap_start = %record.swap_start,
                battery_full_at = %record.battery_full_at,
                "swap completed"
            );
            self.records.push(record);

            if let Some(battery) = self.slots.get_mut(&slot_key) {
                battery.start_charging(
                    pending.request.soc,
                    swap_end,
                    pending.request.capacity_kwh,
                    self.charge_rate_kwh_per_min,
                );
            }

            self.last_swap_end = swap_end;
            time = swap_end;
        }

        self.exchanging = false;
    }

    /// Earliest-available slot at `time`, advancing `time` to the earliest
    /// charge completion when nothing is ready yet.
    fn pick_battery(&self, time: &mut DateTime<Utc>) -> Option<String> {
        // First slot wins ties, keeping slot selection deterministic.
        let available = |t: DateTime<Utc>| {
            let mut best: Option<(&String, DateTime<Utc>)> = None;
            for (key, battery) in &self.slots {
                if !battery.available_at(t) {
                    continue;
                }
                let since = battery.charge_complete_at();
                if best.map_or(true, |(_, b)| since < b) {
                    best = Some((key, since));
                }
            }
            best.map(|(key, _)| key.clone())
        };

        if let Some(key) = available(*time) {
            return Some(key);
        }
        let earliest = self.slots.values().map(Battery::charge_complete_at).min()?;
        if earliest > *time {
            *time = earliest;
        }
        available(*time)
    }

    /// Low-tariff opportunistic swap gate: a battery is ready and the queue
    /// is short.
    pub fn can_swap_early(&self, time: DateTime<Utc>) -> bool {
        self.has_available_battery(time) && self.queue.len() <= 1
    }

    /// Minimum SOC a truck must keep to reach the station over
    /// `distance_km`, with a distance-banded safety margin on top.
    pub fn min_swap_soc(&self, distance_km: f64) -> f64 {
        let required =
            round2(distance_km * self.base_kwh_per_km / self.battery_capacity_kwh * 100.0);
        let extra = if distance_km <= 30.0 {
            0.0
        } else if distance_km <= 60.0 {
            5.0
        } else if distance_km <= 100.0 {
            10.0
        } else {
            15.0
        };
        round2((required + 10.0 + extra).min(100.0))
    }

    /// The append-only exchange ledger, timestamp order re-enforced.
    pub fn records(&mut self) -> &[ExchangeRecord] {
        for record in &mut self.records {
            record.clamp_timestamps();
        }
        &self.records
    }

    /// Record for a specific `(truck, trips)` pair, if its swap resolved.
    pub fn exchange_for(&self, truck_id: &str, trips: u32) -> Option<&ExchangeRecord> {
        self.records
            .iter()
            .find(|r| r.truck_id == truck_id && r.trips == trips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap()
    }

    fn station(batteries: usize) -> SwapStation {
        let config = StationConfig {
            battery_count: batteries,
            ..StationConfig::default()
        };
        SwapStation::new(&config, 1.4, epoch())
    }

    fn request(truck: &str, soc: f64, trips: u32) -> SwapRequest {
        SwapRequest {
            truck_id: truck.into(),
            soc,
            capacity_kwh: 282.0,
            trips,
        }
    }

    #[test]
    fn single_swap_produces_a_record_and_charges_the_pack() {
        let mut station = station(2);
        let t0 = epoch() + Duration::hours(1);
        let record = station.enter(request("t1", 20.0, 1), t0).expect("swap resolved");

        assert_eq!(record.swap_start, t0);
        assert_eq!(record.battery_slot, "no1");
        assert_eq!(record.charge_duration_minutes, 48);
        assert_eq!(
            record.battery_full_at,
            t0 + Duration::minutes(5) + Duration::minutes(48)
        );
        assert_eq!(station.last_swap_end(), t0 + Duration::minutes(5));
        assert_eq!(station.queue_len(), 0);
    }

    #[test]
    fn swaps_serialize_through_the_bay() {
        let mut station = station(5);
        let t0 = epoch() + Duration::hours(1);
        station.enter(request("t1", 30.0, 1), t0);
        // Second truck arrives mid-swap of the first.
        station.enter(request("t2", 25.0, 1), t0 + Duration::minutes(2));

        let records: Vec<ExchangeRecord> = station.records().to_vec();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].truck_id, "t1");
        // t2 cannot start before t1's swap ends.
        assert!(records[1].swap_start >= records[0].swap_start + Duration::minutes(5));
        assert_ne!(records[0].battery_slot, records[1].battery_slot);
    }

    #[test]
    fn empty_pool_defers_until_a_charge_completes() {
        let mut station = station(1);
        let t0 = epoch() + Duration::hours(1);
        let first = station.enter(request("t1", 20.0, 1), t0).expect("first swap");
        // Pool of one: the next truck must wait for the pack to refill.
        let second = station
            .enter(request("t2", 40.0, 1), t0 + Duration::minutes(10))
            .expect("second swap");

        assert_eq!(second.swap_start, first.battery_full_at);
        assert_eq!(
            second.battery_full_at,
            second.battery_available_since
                + Duration::minutes(second.charge_duration_minutes)
        );
        assert_eq!(station.queue_len(), 0);
    }

    #[test]
    fn entering_is_idempotent_per_queue_slot() {
        let mut station = station(2);
        let t0 = epoch() + Duration::hours(1);
        station.enter(request("t1", 20.0, 1), t0);
        station.enter(request("t1", 100.0, 2), t0 + Duration::minutes(30));
        // Distinct trips yield distinct records; nothing is overwritten.
        assert_eq!(station.records().len(), 2);
        assert!(station.exchange_for("t1", 1).is_some());
        assert!(station.exchange_for("t1", 2).is_some());
        assert!(station.exchange_for("t1", 3).is_none());
    }

    #[test]
    fn draining_an_empty_queue_changes_nothing() {
        let mut station = station(2);
        let t0 = epoch() + Duration::hours(1);
        station.enter(request("t1", 20.0, 1), t0);
        let before = station.records().to_vec();
        let last_end = station.last_swap_end();

        station.process_queue(t0 + Duration::minutes(30));
        station.process_queue(t0 + Duration::minutes(30));

        assert_eq!(station.records(), &before[..]);
        assert_eq!(station.last_swap_end(), last_end);
    }

    #[test]
    fn early_swap_gate_checks_pool_and_queue() {
        let mut station = station(1);
        let t0 = epoch() + Duration::hours(1);
        assert!(station.can_swap_early(t0));

        station.enter(request("t1", 20.0, 1), t0);
        // The only pack is now on the charger.
        assert!(!station.can_swap_early(t0 + Duration::minutes(6)));
    }

    #[test]
    fn min_swap_soc_bands() {
        let station = station(1);
        // 20 km: 20*1.4/282*100 = 9.93 + 10
        assert!((station.min_swap_soc(20.0) - 19.93).abs() < 1e-9);
        // 50 km: 24.82 + 15
        assert!((station.min_swap_soc(50.0) - 39.82).abs() < 1e-9);
        // 80 km: 39.72 + 20
        assert!((station.min_swap_soc(80.0) - 59.72).abs() < 1e-9);
        // 150 km: 74.47 + 25
        assert!((station.min_swap_soc(150.0) - 99.47).abs() < 1e-9);
        // Never above 100.
        assert_eq!(station.min_swap_soc(500.0), 100.0);
    }

    #[test]
    fn ledger_timestamps_stay_ordered() {
        let mut station = station(3);
        let t0 = epoch() + Duration::hours(1);
        for (i, soc) in [18.0, 35.0, 52.0].iter().enumerate() {
            station.enter(request(&format!("t{i}"), *soc, 1), t0 + Duration::minutes(i as i64));
        }
        for record in station.records() {
            assert!(record.await_start <= record.swap_start);
            assert!(record.swap_start <= record.battery_available_since);
            assert!(record.battery_available_since <= record.battery_full_at);
        }
    }
}
