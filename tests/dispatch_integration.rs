//! ---
//! evd_section: "08-testing-qa"
//! evd_subsection: "integration-tests"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "End-to-end dispatch simulation scenarios."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use evd_common::config::{SimConfig, TruckSpec};
use evd_geo::GeoPoint;
use evd_scheduler::DispatchSimulation;
use evd_telemetry::{DriveProfile, MemoryFeed, MemoryRateStore, TrackGenerator};

const LOADING: GeoPoint = GeoPoint { lat: 21.360861, lon: 110.050424 };
const UNLOADING: GeoPoint = GeoPoint { lat: 21.425126, lon: 110.163891 };

fn shift_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

fn fleet_config(trucks: Vec<(&str, f64)>, total_cargo: i64) -> SimConfig {
    let mut config = SimConfig::default();
    config.fleet.trucks = trucks
        .into_iter()
        .map(|(id, soc)| TruckSpec {
            id: id.into(),
            soc,
            capacity_kwh: 282.0,
        })
        .collect();
    config.transport.total_cargo = total_cargo;
    config
}

/// Park a truck at the loading yard for the five minutes before the shift.
fn park(feed: &MemoryFeed, generator: &mut TrackGenerator, truck: &str) {
    feed.push_all(generator.stationary(
        truck,
        LOADING,
        shift_start() - Duration::minutes(5),
        6,
        60,
    ));
}

#[test]
fn fleet_shift_upholds_the_exchange_ledger_invariants() {
    let feed = Arc::new(MemoryFeed::new());
    let mut generator = TrackGenerator::new(7);
    park(&feed, &mut generator, "EV-001");
    park(&feed, &mut generator, "EV-002");

    // Two trucks, two cycles each; the low truck must swap on its first
    // return leg.
    let config = fleet_config(vec![("EV-001", 82.0), ("EV-002", 30.0)], 200);
    let mut sim = DispatchSimulation::with_start(
        &config,
        feed,
        Arc::new(MemoryRateStore::new()),
        shift_start(),
    );
    sim.run();

    let exchanges = sim.exchange_records();
    assert_eq!(exchanges.len(), 1);
    for record in &exchanges {
        assert!(record.await_start <= record.swap_start);
        assert!(record.swap_start <= record.battery_available_since);
        assert!(record.battery_available_since <= record.battery_full_at);
        assert_eq!(
            record.battery_full_at - record.battery_available_since,
            Duration::minutes(record.charge_duration_minutes)
        );
        assert!(record.soc < 100.0);
    }

    let schedule = sim.schedule_records();
    assert_eq!(schedule.len(), 4);
    for cycle in &schedule {
        assert!(cycle.end_time >= cycle.start_time);
        if let Some(detail) = &cycle.exchange {
            assert_eq!(detail.truck_id, cycle.truck_id);
            assert_eq!(detail.trips, cycle.trips);
            assert!(cycle.needs_exchange);
        }
    }
    assert_eq!(
        schedule.iter().filter(|c| c.needs_exchange).count(),
        1,
        "only the low truck detours to the station"
    );

    let trips: u32 = sim.trucks().iter().map(|t| t.trips).sum();
    assert_eq!(trips, 4);
}

#[test]
fn swap_intervals_never_overlap_station_wide() {
    let feed = Arc::new(MemoryFeed::new());
    let mut generator = TrackGenerator::new(7);
    for id in ["EV-001", "EV-002", "EV-003"] {
        park(&feed, &mut generator, id);
    }

    // Three low trucks reach the station in the same minute.
    let config = fleet_config(
        vec![("EV-001", 30.0), ("EV-002", 30.0), ("EV-003", 30.0)],
        150,
    );
    let mut sim = DispatchSimulation::with_start(
        &config,
        feed,
        Arc::new(MemoryRateStore::new()),
        shift_start(),
    );
    sim.run();

    let exchanges = sim.exchange_records();
    assert_eq!(exchanges.len(), 3);
    for pair in exchanges.windows(2) {
        assert!(
            pair[1].swap_start >= pair[0].swap_start + Duration::minutes(5),
            "swap bay double-booked: {} then {}",
            pair[0].swap_start,
            pair[1].swap_start
        );
    }
}

#[test]
fn truck_joining_mid_delivery_finishes_its_leg_before_the_next_cycle() {
    let feed = Arc::new(MemoryFeed::new());
    let mut generator = TrackGenerator::new(11);
    // 25 minutes of track from the loading yard to 70% of the way out.
    let two_thirds_out = GeoPoint::new(
        LOADING.lat + 0.7 * (UNLOADING.lat - LOADING.lat),
        LOADING.lon + 0.7 * (UNLOADING.lon - LOADING.lon),
    );
    feed.push_all(generator.leg(
        "EV-001",
        LOADING,
        two_thirds_out,
        shift_start(),
        6,
        300,
        &DriveProfile::default(),
    ));
    let joined = shift_start() + Duration::minutes(25);

    let config = fleet_config(vec![("EV-001", 82.0)], 50);
    let mut sim = DispatchSimulation::with_start(
        &config,
        feed,
        Arc::new(MemoryRateStore::new()),
        shift_start(),
    );
    sim.run();

    let schedule = sim.schedule_records();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].start_time, joined);
    assert!(schedule[0].end_time > joined);
    assert_eq!(sim.trucks()[0].trips, 1);
    assert!(sim.exchange_records().is_empty());
}

#[test]
fn ledger_json_round_trips_and_is_ordered() {
    let feed = Arc::new(MemoryFeed::new());
    let mut generator = TrackGenerator::new(3);
    park(&feed, &mut generator, "EV-001");
    park(&feed, &mut generator, "EV-002");

    let config = fleet_config(vec![("EV-001", 30.0), ("EV-002", 30.0)], 100);
    let mut sim = DispatchSimulation::with_start(
        &config,
        feed,
        Arc::new(MemoryRateStore::new()),
        shift_start(),
    );
    sim.run();

    let exchanges: serde_json::Value =
        serde_json::from_str(&sim.exchange_records_json().unwrap()).unwrap();
    let entries = exchanges.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let awaits: Vec<&str> = entries
        .iter()
        .map(|e| e["await_start"].as_str().unwrap())
        .collect();
    let mut sorted = awaits.clone();
    sorted.sort();
    assert_eq!(awaits, sorted);

    let schedule: serde_json::Value =
        serde_json::from_str(&sim.schedule_records_json().unwrap()).unwrap();
    for cycle in schedule.as_array().unwrap() {
        assert!(cycle["id"].as_str().is_some());
        assert!(cycle["status_icon"].as_str().is_some());
    }
}
