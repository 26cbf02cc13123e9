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

use evd_common::config::EnergyConfig;
use evd_geo::{RouteSegment, SiteMap, SitePoint};
use evd_telemetry::ConsumptionStore;
use tracing::{debug, warn};

use crate::errors::{EnergyError, Result};

/// SOC cost model.
///
/// All costs are percentage points of the given pack capacity. A learned
/// per-truck rate from the consumption store takes precedence whenever one is
/// present and positive; otherwise the parametric model applies a base rate
/// and load/environment factors.
pub struct EnergyModel {
    config: EnergyConfig,
    sites: Arc<SiteMap>,
    store: Arc<dyn ConsumptionStore>,
}

impl EnergyModel {
    pub fn new(config: EnergyConfig, sites: Arc<SiteMap>, store: Arc<dyn ConsumptionStore>) -> Self {
        Self { config, sites, store }
    }

    pub fn sites(&self) -> &SiteMap {
        &self.sites
    }

    /// SOC percentage consumed over `distance_km` in the given load state.
    pub fn cost(
        &self,
        distance_km: f64,
        loaded: bool,
        capacity_kwh: f64,
        truck_id: Option<&str>,
    ) -> Result<f64> {
        if !capacity_kwh.is_finite() || capacity_kwh <= 0.0 {
            return Err(EnergyError::InvalidCapacity(capacity_kwh));
        }
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(EnergyError::InvalidDistance(distance_km));
        }

        if let Some(truck_id) = truck_id {
            if let Some(rate) = self.store.get(truck_id, loaded) {
                if rate > 0.0 {
                    let soc = distance_km * rate / capacity_kwh * 100.0;
                    debug!(
                        truck = truck_id,
                        loaded,
                        rate,
                        distance_km,
                        soc,
                        "learned-rate SOC cost"
                    );
                    return Ok(soc.max(0.0));
                }
            }
        }

        let load_factor = if loaded {
            self.config.load_factor_loaded
        } else {
            self.config.load_factor_empty
        };
        let environment =
            self.config.speed_factor * self.config.terrain_factor * self.config.weather_factor;
        let adjusted_kwh = distance_km * self.config.base_kwh_per_km * load_factor * environment;
        Ok((adjusted_kwh / capacity_kwh * 100.0).max(0.0))
    }

    /// SOC cost of one complete haul cycle: the laden delivery run plus the
    /// empty leg to the battery station.
    pub fn full_cycle_cost(&self, capacity_kwh: f64, truck_id: Option<&str>) -> Result<f64> {
        let delivery_km = self.sites.distance_km(SitePoint::Loading, SitePoint::Unloading);
        let station_km = self.sites.distance_km(SitePoint::Unloading, SitePoint::Swap);
        let loaded = self.cost(delivery_km, true, capacity_kwh, truck_id)?;
        let empty = self.cost(station_km, false, capacity_kwh, truck_id)?;
        Ok(loaded + empty)
    }

    /// SOC cost to finish the current leg, given how much of it remains.
    ///
    /// `remaining_fraction` is clamped to [0, 1]. The delivery leg includes
    /// the empty return past the station, and the composite
    /// loading→unloading→station leg splits its remaining distance into the
    /// laden and empty portions.
    pub fn remaining_cost(
        &self,
        segment: RouteSegment,
        remaining_fraction: f64,
        capacity_kwh: f64,
        truck_id: Option<&str>,
    ) -> Result<f64> {
        let fraction = remaining_fraction.clamp(0.0, 1.0);
        match segment {
            RouteSegment::StartToLoading => {
                let km = fraction * self.sites.distance_km(SitePoint::Start, SitePoint::Loading);
                self.cost(km, false, capacity_kwh, truck_id)
            }
            RouteSegment::LoadingToUnloading => {
                let delivery_km =
                    fraction * self.sites.distance_km(SitePoint::Loading, SitePoint::Unloading);
                let return_km = self.sites.distance_km(SitePoint::Unloading, SitePoint::Swap)
                    + self.sites.distance_km(SitePoint::Swap, SitePoint::Loading);
                let ahead = self.cost(delivery_km, true, capacity_kwh, truck_id)?;
                let back = self.cost(return_km, false, capacity_kwh, truck_id)?;
                Ok(ahead + back)
            }
            RouteSegment::LoadingToUnloadingToSwap => {
                let station_km = self.sites.distance_km(SitePoint::Unloading, SitePoint::Swap);
                let total_km = self.sites.distance_km(SitePoint::Loading, SitePoint::Unloading)
                    + station_km;
                let remaining_km = fraction * total_km;
                if remaining_km > station_km {
                    // Still on the laden stretch before the unloading yard.
                    let laden = self.cost(remaining_km - station_km, true, capacity_kwh, truck_id)?;
                    let empty = self.cost(station_km, false, capacity_kwh, truck_id)?;
                    Ok(laden + empty)
                } else {
                    self.cost(remaining_km, false, capacity_kwh, truck_id)
                }
            }
            RouteSegment::UnloadingToLoading => {
                let km =
                    fraction * self.sites.distance_km(SitePoint::Unloading, SitePoint::Loading);
                self.cost(km, false, capacity_kwh, truck_id)
            }
            RouteSegment::UnloadingToSwap | RouteSegment::SwapToLoading => {
                let km = fraction * self.sites.segment_km(segment);
                self.cost(km, false, capacity_kwh, truck_id)
            }
            RouteSegment::Unknown => Err(EnergyError::UnknownSegment),
        }
    }

    /// Whether the truck should route via the battery station before its
    /// next cycle.
    ///
    /// A missing SOC reading always swaps.
    pub fn should_swap(
        &self,
        current_soc: Option<f64>,
        full_cycle_cost: f64,
        remaining_leg_cost: f64,
    ) -> bool {
        let Some(soc) = current_soc else {
            warn!("soc reading missing, routing via the station");
            return true;
        };
        let required = full_cycle_cost + remaining_leg_cost + self.config.safety_margin_percent;
        let swap = soc <= required;
        debug!(soc, required, swap, "swap decision");
        swap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evd_telemetry::MemoryRateStore;

    fn model_with_store(store: Arc<MemoryRateStore>) -> EnergyModel {
        EnergyModel::new(
            EnergyConfig::default(),
            Arc::new(SiteMap::default()),
            store,
        )
    }

    fn model() -> EnergyModel {
        model_with_store(Arc::new(MemoryRateStore::new()))
    }

    #[test]
    fn parametric_cost_uses_load_factors() {
        let m = model();
        // 21.3 km * 1.4 kWh/km * 1.3 / 282 kWh * 100
        let loaded = m.cost(21.3, true, 282.0, None).unwrap();
        assert!((loaded - 21.3 * 1.4 * 1.3 / 282.0 * 100.0).abs() < 1e-9);
        let empty = m.cost(21.3, false, 282.0, None).unwrap();
        assert!(empty < loaded);
    }

    #[test]
    fn learned_rate_takes_precedence() {
        let store = Arc::new(MemoryRateStore::new());
        store.put("t1", true, 2.0);
        let m = model_with_store(store);
        let learned = m.cost(10.0, true, 282.0, Some("t1")).unwrap();
        assert!((learned - 10.0 * 2.0 / 282.0 * 100.0).abs() < 1e-9);
        // A truck without a stored rate still gets the parametric number.
        let parametric = m.cost(10.0, true, 282.0, Some("t2")).unwrap();
        assert!((parametric - 10.0 * 1.4 * 1.3 / 282.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let m = model();
        assert!(matches!(
            m.cost(10.0, true, 0.0, None),
            Err(EnergyError::InvalidCapacity(_))
        ));
        assert!(matches!(
            m.cost(-1.0, true, 282.0, None),
            Err(EnergyError::InvalidDistance(_))
        ));
        assert!(matches!(
            m.remaining_cost(RouteSegment::Unknown, 0.5, 282.0, None),
            Err(EnergyError::UnknownSegment)
        ));
    }

    #[test]
    fn full_cycle_is_delivery_plus_station_leg() {
        let m = model();
        let cycle = m.full_cycle_cost(282.0, None).unwrap();
        let delivery = m.cost(21.3, true, 282.0, None).unwrap();
        let station = m.cost(13.7, false, 282.0, None).unwrap();
        assert!((cycle - (delivery + station)).abs() < 1e-9);
    }

    #[test]
    fn delivery_leg_remainder_includes_the_return() {
        let m = model();
        // At the unloading gate (fraction 0) the cost is exactly the empty
        // return past the station.
        let at_gate = m
            .remaining_cost(RouteSegment::LoadingToUnloading, 0.0, 282.0, None)
            .unwrap();
        let return_cost = m.cost(13.7 + 7.6, false, 282.0, None).unwrap();
        assert!((at_gate - return_cost).abs() < 1e-9);
    }

    #[test]
    fn composite_leg_splits_at_the_station_hop() {
        let m = model();
        let total_km = 21.3 + 13.7;
        // Remaining 20 km: 6.3 laden + 13.7 empty.
        let frac = 20.0 / total_km;
        let cost = m
            .remaining_cost(RouteSegment::LoadingToUnloadingToSwap, frac, 282.0, None)
            .unwrap();
        let expect = m.cost(20.0 - 13.7, true, 282.0, None).unwrap()
            + m.cost(13.7, false, 282.0, None).unwrap();
        assert!((cost - expect).abs() < 1e-9);

        // Remaining 5 km: already past unloading, all empty.
        let frac = 5.0 / total_km;
        let tail = m
            .remaining_cost(RouteSegment::LoadingToUnloadingToSwap, frac, 282.0, None)
            .unwrap();
        let expect_tail = m.cost(5.0, false, 282.0, None).unwrap();
        assert!((tail - expect_tail).abs() < 1e-9);
    }

    #[test]
    fn remaining_cost_is_monotonic_in_fraction() {
        let m = model();
        let mut prev = -1.0;
        for step in 0..=10 {
            let frac = step as f64 / 10.0;
            let cost = m
                .remaining_cost(RouteSegment::UnloadingToSwap, frac, 282.0, None)
                .unwrap();
            assert!(cost >= prev);
            prev = cost;
        }
        // Out-of-range fractions clamp rather than extrapolate.
        let over = m
            .remaining_cost(RouteSegment::UnloadingToSwap, 1.7, 282.0, None)
            .unwrap();
        assert!((over - prev).abs() < 1e-9);
    }

    #[test]
    fn swap_decision_boundary_and_missing_soc() {
        let m = model();
        assert!(m.should_swap(None, 10.0, 5.0));
        // Boundary is inclusive: soc equal to the requirement still swaps.
        assert!(m.should_swap(Some(25.0), 10.0, 5.0));
        assert!(!m.should_swap(Some(25.01), 10.0, 5.0));
    }
}
