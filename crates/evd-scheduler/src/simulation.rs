//! ---
//! evd_section: "07-dispatch-scheduler"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Discrete-event fleet dispatch simulation."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use evd_common::config::SimConfig;
use evd_common::{drive_minutes, round2};
use evd_energy::{Calibrator, EnergyModel};
use evd_geo::{RouteSegment, SiteMap, SitePoint};
use evd_routing::{RouteClassifier, RouteInfo};
use evd_station::{should_delay_exchange, should_exchange_early, ExchangeRecord, SwapStation};
use evd_telemetry::{ConsumptionStore, TelemetryFeed};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::records::ScheduleRecord;
use crate::truck::Truck;

/// Below this SOC a swap is taken unless the tariff calendar argues for
/// holding it one more trip.
const EXCHANGE_SOC_LIMIT: f64 = 35.0;

struct TruckProgress {
    next_departure: DateTime<Utc>,
    /// Route the truck was on when the simulation joined it, consumed by the
    /// first cycle.
    mid_route: Option<RouteInfo>,
    remaining_cargo: i64,
}

/// The dispatch simulation: one shift of cargo cycles for a fleet of trucks
/// sharing one swap station.
///
/// Trucks are processed strictly in departure-time order, so a truck that
/// reaches the station first also swaps first.
pub struct DispatchSimulation {
    trucks: Vec<Truck>,
    station: SwapStation,
    energy: EnergyModel,
    classifier: RouteClassifier,
    feed: Arc<dyn TelemetryFeed>,
    config: SimConfig,
    start: DateTime<Utc>,
    progress: IndexMap<String, TruckProgress>,
    schedule: Vec<ScheduleRecord>,
}

impl DispatchSimulation {
    /// Build a simulation starting today at the configured shift hour.
    pub fn new(
        config: &SimConfig,
        feed: Arc<dyn TelemetryFeed>,
        store: Arc<dyn ConsumptionStore>,
    ) -> Self {
        let naive = Utc::now()
            .date_naive()
            .and_hms_opt(config.start_hour.min(23), 0, 0)
            .unwrap_or_else(|| Utc::now().naive_utc());
        let start = Utc.from_utc_datetime(&naive);
        Self::with_start(config, feed, store, start)
    }

    /// Build a simulation with an explicit start instant.
    pub fn with_start(
        config: &SimConfig,
        feed: Arc<dyn TelemetryFeed>,
        store: Arc<dyn ConsumptionStore>,
        start: DateTime<Utc>,
    ) -> Self {
        let sites = Arc::new(SiteMap::default());
        let energy = EnergyModel::new(config.energy.clone(), sites.clone(), store.clone());
        let classifier = RouteClassifier::new(
            feed.clone(),
            sites,
            Calibrator::new(feed.clone(), store),
        );
        // The pool must read as available before the first truck arrives.
        let station = SwapStation::new(
            &config.station,
            config.energy.base_kwh_per_km,
            start - Duration::hours(1),
        );

        let trucks: Vec<Truck> = config.fleet.trucks.iter().map(Truck::from_spec).collect();
        let per_truck = if trucks.is_empty() {
            0
        } else {
            let n = trucks.len() as i64;
            (config.transport.total_cargo + n - 1) / n
        };
        let progress = trucks
            .iter()
            .map(|t| {
                (
                    t.id.clone(),
                    TruckProgress {
                        next_departure: start,
                        mid_route: None,
                        remaining_cargo: per_truck,
                    },
                )
            })
            .collect();

        Self {
            trucks,
            station,
            energy,
            classifier,
            feed,
            config: config.clone(),
            start,
            progress,
            schedule: Vec::new(),
        }
    }

    /// Run the shift to completion: every truck hauls its cargo share in
    /// repeated cycles, swapping batteries as the energy model dictates.
    pub fn run(&mut self) {
        if self.config.transport.cargo_per_trip <= 0 {
            warn!("cargo per trip is not positive, nothing to haul");
            return;
        }

        info!(
            trucks = self.trucks.len(),
            total_cargo = self.config.transport.total_cargo,
            start = %self.start,
            "dispatch simulation starting"
        );

        self.initial_departures();

        loop {
            let mut due: Vec<String> = self
                .progress
                .iter()
                .filter(|(_, p)| p.remaining_cargo > 0)
                .map(|(id, _)| id.clone())
                .collect();
            if due.is_empty() {
                break;
            }
            // Stable sort: equal departure times keep fleet order.
            due.sort_by_key(|id| self.progress[id].next_departure);

            for id in due {
                let depart = self.progress[&id].next_departure;
                let cached = self
                    .progress
                    .get_mut(&id)
                    .and_then(|p| p.mid_route.take());

                let Some(idx) = self.trucks.iter().position(|t| t.id == id) else {
                    continue;
                };
                let mut truck = self.trucks[idx].clone();

                let record = ScheduleRecord::open(&id, depart, truck.trips + 1);
                let (arrival, swapped) = match cached {
                    Some(route) => self.resume_cycle(&mut truck, depart, &route),
                    None => self.full_cycle(&mut truck, depart),
                };
                self.trucks[idx] = truck;
                self.close_leg(record, arrival, swapped);

                let progress = &mut self.progress[&id];
                progress.next_departure = arrival;
                progress.remaining_cargo -= self.config.transport.cargo_per_trip;
                debug!(
                    truck = %id,
                    arrival = %arrival,
                    cargo_left = progress.remaining_cargo,
                    swapped,
                    "cycle complete"
                );
            }
        }

        info!(cycles = self.schedule.len(), "dispatch simulation finished");
    }

    /// First pass: place every truck on the corridor.
    ///
    /// A truck already mid-route adopts its telemetry report time as the
    /// moment it becomes schedulable and carries the classified route into
    /// its first cycle. A truck still on the depot leg is driven to loading,
    /// via the station when the energy model demands it.
    fn initial_departures(&mut self) {
        for idx in 0..self.trucks.len() {
            let mut truck = self.trucks[idx].clone();
            let route = self.classifier.classify(&truck.id, truck.capacity_kwh);
            if let Some(soc) = route.soc {
                truck.soc = round2(soc);
            }
            let t0 = self
                .feed
                .current(&truck.id)
                .map(|f| f.report_time)
                .unwrap_or(self.start);

            if route.segment != RouteSegment::StartToLoading {
                info!(
                    truck = %truck.id,
                    segment = route.segment.describe(),
                    "truck joins mid-route"
                );
                let progress = &mut self.progress[&truck.id];
                progress.next_departure = t0;
                progress.mid_route = Some(route);
                self.trucks[idx] = truck;
                continue;
            }

            let full = self.cycle_cost(&truck);
            let remaining = self.route_cost(&route, &truck);
            let arrival = if self.energy.should_swap(Some(truck.soc), full, remaining) {
                self.depot_via_station(&mut truck, t0, &route)
            } else {
                truck.drain(remaining);
                t0 + self.drive(route.remaining_km)
            };

            self.progress[&truck.id].next_departure = arrival;
            self.trucks[idx] = truck;
        }
    }

    /// One comprehensive haul cycle from the loading yard: dock, laden run,
    /// then the return decision.
    fn full_cycle(&mut self, truck: &mut Truck, t0: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        let delivery_km = self.distance(SitePoint::Loading, SitePoint::Unloading);
        let outbound = match self
            .energy
            .cost(delivery_km, true, truck.capacity_kwh, Some(&truck.id))
        {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, %err, "leg cost failed, using the fixed-distance cycle");
                return self.fallback_cycle(truck, t0);
            }
        };

        truck.trips += 1;
        truck.drain(outbound);
        let at_unloading = t0 + self.dock() + self.drive(delivery_km);
        self.return_leg(truck, at_unloading)
    }

    /// Decide the way home from the unloading yard: straight back, or a
    /// detour through the station when the next full cycle is not covered.
    fn return_leg(&mut self, truck: &mut Truck, at_unloading: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        let return_km = self.distance(SitePoint::Unloading, SitePoint::Loading);
        let return_cost = match self
            .energy
            .cost(return_km, false, truck.capacity_kwh, Some(&truck.id))
        {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, %err, "return cost failed, using the fixed-distance leg");
                return self.fallback_return_leg(truck, at_unloading);
            }
        };

        let full = self.cycle_cost(truck);
        if self.energy.should_swap(Some(truck.soc), full, return_cost) {
            let arrival = self.return_via_station(truck, at_unloading);
            (arrival, true)
        } else {
            truck.drain(return_cost);
            (at_unloading + self.dock() + self.drive(return_km), false)
        }
    }

    /// Unloading → station → loading, swapping in between. No dock time on
    /// the detour; the load was dropped where the decision was made.
    fn return_via_station(&mut self, truck: &mut Truck, at_unloading: DateTime<Utc>) -> DateTime<Utc> {
        let station_km = self.distance(SitePoint::Unloading, SitePoint::Swap);
        let cost_in = self.leg_cost(station_km, false, truck);
        truck.drain(cost_in);
        let at_station = at_unloading + self.drive(station_km);

        let exchanged = self.station.enter(truck.swap_request(), at_station);
        let swap_end = self.exchange_end(exchanged.as_ref(), at_station);

        let back_km = self.distance(SitePoint::Swap, SitePoint::Loading);
        let cost_back = self.leg_cost(back_km, false, truck);
        truck.leave_station(cost_back);
        swap_end + self.drive(back_km)
    }

    /// Start leg with a swap first: depot → station → loading.
    fn depot_via_station(&mut self, truck: &mut Truck, t0: DateTime<Utc>, route: &RouteInfo) -> DateTime<Utc> {
        info!(truck = %truck.id, soc = truck.soc, "swapping before the first cycle");
        let station_km = self.distance(SitePoint::Start, SitePoint::Swap);
        let to_station = self.route_cost(route, truck);
        truck.drain(to_station);
        let at_station = t0 + self.drive(station_km);

        let exchanged = self.station.enter(truck.swap_request(), at_station);
        let swap_end = self.exchange_end(exchanged.as_ref(), at_station);

        let back_km = self.distance(SitePoint::Swap, SitePoint::Loading);
        let cost_back = self.leg_cost(back_km, false, truck);
        truck.leave_station(cost_back);
        swap_end + self.drive(back_km)
    }

    /// First cycle of a truck that joined mid-route.
    fn resume_cycle(
        &mut self,
        truck: &mut Truck,
        t0: DateTime<Utc>,
        route: &RouteInfo,
    ) -> (DateTime<Utc>, bool) {
        let full = self.cycle_cost(truck);
        let remaining = self.route_cost(route, truck);
        if !self.energy.should_swap(Some(truck.soc), full, remaining) {
            return (self.finish_leg_and_return(truck, t0, route), false);
        }

        // A swap is due this cycle. Can the pack at least carry the truck to
        // the station along the current corridor?
        let via_station = match self.energy.remaining_cost(
            RouteSegment::LoadingToUnloadingToSwap,
            route.remaining_fraction(),
            truck.capacity_kwh,
            Some(&truck.id),
        ) {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, %err, "detour cost failed, using the fixed-distance estimate");
                self.fallback_cost(route.remaining_km, true)
            }
        };

        if self.energy.should_swap(Some(truck.soc), 0.0, via_station) {
            (self.swap_now_then_continue(truck, t0, route), true)
        } else {
            (self.finish_leg_via_station(truck, t0, route), true)
        }
    }

    /// Finish the classified leg and come home, no swap.
    fn finish_leg_and_return(&mut self, truck: &mut Truck, t0: DateTime<Utc>, route: &RouteInfo) -> DateTime<Utc> {
        let remaining = self.route_cost(route, truck);
        truck.drain(remaining);
        if route.segment == RouteSegment::LoadingToUnloading {
            // The remaining cost already covers the way home.
            truck.trips += 1;
            let home_km = self.distance(SitePoint::Unloading, SitePoint::Loading);
            t0 + self.dock() + self.drive(route.remaining_km + home_km)
        } else {
            t0 + self.drive(route.remaining_km)
        }
    }

    /// Finish the classified leg, then swap on the way home.
    fn finish_leg_via_station(&mut self, truck: &mut Truck, t0: DateTime<Utc>, route: &RouteInfo) -> DateTime<Utc> {
        let station_hop = self.distance(SitePoint::Unloading, SitePoint::Swap);
        let at_station = if route.segment == RouteSegment::LoadingToUnloading {
            let laden = self.leg_cost(route.remaining_km, true, truck);
            let hop = self.leg_cost(station_hop, false, truck);
            truck.drain(laden + hop);
            truck.trips += 1;
            t0 + self.dock() + self.drive(route.remaining_km + station_hop)
        } else {
            let remaining = self.route_cost(route, truck);
            truck.drain(remaining);
            t0 + self.drive(route.remaining_km)
        };

        let exchanged = self.station.enter(truck.swap_request(), at_station);
        let swap_end = self.exchange_end(exchanged.as_ref(), at_station);

        let back_km = self.distance(SitePoint::Swap, SitePoint::Loading);
        let cost_back = self.leg_cost(back_km, false, truck);
        truck.leave_station(cost_back);
        swap_end + self.drive(back_km)
    }

    /// The pack cannot even finish the current leg: break off to the station
    /// immediately, then run the cycle on the fresh pack.
    fn swap_now_then_continue(&mut self, truck: &mut Truck, t0: DateTime<Utc>, route: &RouteInfo) -> DateTime<Utc> {
        info!(truck = %truck.id, soc = truck.soc, "breaking off the leg for an immediate swap");
        let origin = Self::segment_origin(route.segment);
        let station_km = self.distance(origin, SitePoint::Swap);
        // Coarse split: the detour replaces roughly a third of the leg.
        let to_station = 0.3 * self.route_cost(route, truck);
        truck.drain(to_station);
        let at_station = t0 + self.drive(station_km);

        let exchanged = self.station.enter(truck.swap_request(), at_station);
        let swap_end = self.exchange_end(exchanged.as_ref(), at_station);

        let back_km = self.distance(SitePoint::Swap, SitePoint::Loading);
        if matches!(
            route.segment,
            RouteSegment::LoadingToUnloading | RouteSegment::LoadingToUnloadingToSwap
        ) {
            // The interrupted delivery still has to happen: run the whole
            // cycle from the station on the fresh pack.
            let delivery_km = self.distance(SitePoint::Loading, SitePoint::Unloading);
            let home_km = self.distance(SitePoint::Unloading, SitePoint::Swap) + back_km;
            let c_back = self.leg_cost(back_km, false, truck);
            let c_delivery = self.leg_cost(delivery_km, true, truck);
            let c_home = self.leg_cost(home_km, false, truck);
            truck.trips += 1;
            truck.leave_station(c_back + c_delivery + c_home);
            swap_end
                + self.drive(back_km)
                + self.dock()
                + self.drive(delivery_km)
                + self.drive(self.distance(SitePoint::Unloading, SitePoint::Loading))
        } else {
            let cost_back = self.leg_cost(back_km, false, truck);
            truck.leave_station(cost_back);
            swap_end + self.drive(back_km)
        }
    }

    // --- fixed-distance fallback path ---

    /// Cycle computed entirely from nominal distances, taken when the energy
    /// model rejects the truck's inputs.
    fn fallback_cycle(&mut self, truck: &mut Truck, t0: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        let delivery_km = self.distance(SitePoint::Loading, SitePoint::Unloading);
        truck.trips += 1;
        truck.drain(self.fallback_cost(delivery_km, true));
        let at_unloading = t0 + self.dock() + self.drive(delivery_km);
        self.fallback_return_leg(truck, at_unloading)
    }

    /// Return decision on nominal distances, tariff-aware: a low pack must
    /// swap, a marginal pack may hold the swap for a cheaper band, and a
    /// healthy pack may swap early when the grid is about to get expensive.
    fn fallback_return_leg(&mut self, truck: &mut Truck, at_unloading: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        let station_km = self.distance(SitePoint::Unloading, SitePoint::Swap);
        let return_km = self.distance(SitePoint::Unloading, SitePoint::Loading);
        let delivery_km = self.distance(SitePoint::Loading, SitePoint::Unloading);

        let at_station_eta = at_unloading + self.drive(station_km);
        let next_trip_end = at_unloading
            + self.dock()
            + self.drive(delivery_km)
            + self.drive(return_km)
            + self.drive(station_km);

        let swap = if truck.soc < self.station.min_swap_soc(station_km) {
            true
        } else if truck.soc < EXCHANGE_SOC_LIMIT {
            let next_km = delivery_km + station_km;
            let holdable = should_delay_exchange(at_station_eta, next_trip_end)
                && truck.soc - self.fallback_cost(next_km, true)
                    >= self.station.min_swap_soc(next_km);
            !holdable
        } else {
            should_exchange_early(at_station_eta, next_trip_end)
                && self.station.can_swap_early(at_station_eta)
        };

        if swap {
            truck.drain(self.fallback_cost(station_km, false));
            let exchanged = self.station.enter(truck.swap_request(), at_station_eta);
            let swap_end = self.exchange_end(exchanged.as_ref(), at_station_eta);
            let back_km = self.distance(SitePoint::Swap, SitePoint::Loading);
            truck.leave_station(self.fallback_cost(back_km, false));
            (swap_end + self.drive(back_km), true)
        } else {
            truck.drain(self.fallback_cost(return_km, false));
            (at_unloading + self.drive(return_km), false)
        }
    }

    // --- cost and clock helpers ---

    fn leg_cost(&self, km: f64, loaded: bool, truck: &Truck) -> f64 {
        match self.energy.cost(km, loaded, truck.capacity_kwh, Some(&truck.id)) {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, km, %err, "leg cost failed, using the nominal rate");
                self.fallback_cost(km, loaded)
            }
        }
    }

    fn route_cost(&self, route: &RouteInfo, truck: &Truck) -> f64 {
        match self.energy.remaining_cost(
            route.segment,
            route.remaining_fraction(),
            truck.capacity_kwh,
            Some(&truck.id),
        ) {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, %err, "remaining cost failed, using the nominal rate");
                self.fallback_cost(route.remaining_km, route.segment.is_loaded())
            }
        }
    }

    fn cycle_cost(&self, truck: &Truck) -> f64 {
        match self.energy.full_cycle_cost(truck.capacity_kwh, Some(&truck.id)) {
            Ok(cost) => cost,
            Err(err) => {
                warn!(truck = %truck.id, %err, "cycle cost failed, using the nominal rate");
                self.fallback_cost(self.distance(SitePoint::Loading, SitePoint::Unloading), true)
                    + self.fallback_cost(
                        self.distance(SitePoint::Unloading, SitePoint::Swap),
                        false,
                    )
            }
        }
    }

    /// Nominal parametric SOC cost at the default pack capacity. Pure
    /// arithmetic, cannot fail.
    fn fallback_cost(&self, km: f64, loaded: bool) -> f64 {
        let energy = &self.config.energy;
        let capacity = if energy.default_capacity_kwh > 0.0 {
            energy.default_capacity_kwh
        } else {
            282.0
        };
        let factor = if loaded {
            energy.load_factor_loaded
        } else {
            energy.load_factor_empty
        };
        (km.max(0.0) * energy.base_kwh_per_km * factor / capacity * 100.0).max(0.0)
    }

    /// When the swap resolved in-call the truck leaves five minutes after the
    /// bay opened for it; a queued truck is planned with a flat allowance.
    fn exchange_end(&self, record: Option<&ExchangeRecord>, entered: DateTime<Utc>) -> DateTime<Utc> {
        match record {
            Some(r) => r.swap_start + Duration::minutes(self.config.station.exchange_minutes),
            None => entered + Duration::minutes(10),
        }
    }

    fn distance(&self, from: SitePoint, to: SitePoint) -> f64 {
        self.energy.sites().distance_km(from, to)
    }

    fn drive(&self, km: f64) -> Duration {
        Duration::minutes(drive_minutes(km, self.config.transport.average_speed_kmh))
    }

    fn dock(&self) -> Duration {
        Duration::minutes(self.config.transport.dock_minutes)
    }

    fn segment_origin(segment: RouteSegment) -> SitePoint {
        match segment {
            RouteSegment::StartToLoading | RouteSegment::Unknown => SitePoint::Start,
            RouteSegment::LoadingToUnloading | RouteSegment::LoadingToUnloadingToSwap => {
                SitePoint::Loading
            }
            RouteSegment::UnloadingToSwap | RouteSegment::UnloadingToLoading => SitePoint::Unloading,
            RouteSegment::SwapToLoading => SitePoint::Swap,
        }
    }

    fn close_leg(&mut self, mut record: ScheduleRecord, end: DateTime<Utc>, swapped: bool) {
        let exchange = if swapped {
            self.station
                .exchange_for(&record.truck_id, record.trips)
                .cloned()
        } else {
            None
        };
        record.close(end, swapped, exchange);
        self.schedule.push(record);
    }

    // --- outputs ---

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    pub fn station(&self) -> &SwapStation {
        &self.station
    }

    /// Exchange ledger ordered by when each truck started waiting.
    pub fn exchange_records(&mut self) -> Vec<ExchangeRecord> {
        let mut records = self.station.records().to_vec();
        records.sort_by_key(|r| r.await_start);
        records
    }

    /// Dispatch ledger in creation order.
    pub fn schedule_records(&self) -> Vec<ScheduleRecord> {
        let mut records = self.schedule.clone();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn exchange_records_json(&mut self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.exchange_records())?)
    }

    pub fn schedule_records_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.schedule_records())?)
    }
}
