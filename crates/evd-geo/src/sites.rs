//! ---
//! evd_section: "02-geography"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Static geography for the dispatch corridor."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::point::GeoPoint;
use crate::segment::RouteSegment;

/// Radius in metres within which a GPS fix counts as "at" a site.
pub const SITE_THRESHOLD_M: f64 = 100.0;

/// The four fixed sites of the haul corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SitePoint {
    Start,
    Loading,
    Unloading,
    Swap,
}

impl SitePoint {
    pub fn describe(&self) -> &'static str {
        match self {
            SitePoint::Start => "depot",
            SitePoint::Loading => "loading",
            SitePoint::Unloading => "unloading",
            SitePoint::Swap => "station",
        }
    }
}

/// Road distances and coordinates for the corridor.
///
/// Route distances are configured per site pair (road kilometres, not
/// straight-line). When a pair is missing from the table the haversine
/// distance between coordinates is used instead, so an operator can describe
/// a new corridor with coordinates alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMap {
    coordinates: IndexMap<SitePoint, GeoPoint>,
    distances: IndexMap<(SitePoint, SitePoint), f64>,
}

impl Default for SiteMap {
    fn default() -> Self {
        let mut coordinates = IndexMap::new();
        coordinates.insert(SitePoint::Start, GeoPoint::new(21.425126, 110.163891));
        coordinates.insert(SitePoint::Loading, GeoPoint::new(21.360861, 110.050424));
        coordinates.insert(SitePoint::Unloading, GeoPoint::new(21.425126, 110.163891));
        coordinates.insert(SitePoint::Swap, GeoPoint::new(21.349973, 110.108390));

        let mut map = Self {
            coordinates,
            distances: IndexMap::new(),
        };
        map.set_distance(SitePoint::Start, SitePoint::Loading, 21.3);
        map.set_distance(SitePoint::Loading, SitePoint::Unloading, 21.3);
        map.set_distance(SitePoint::Unloading, SitePoint::Swap, 13.7);
        map.set_distance(SitePoint::Swap, SitePoint::Loading, 7.6);
        map
    }
}

impl SiteMap {
    /// Record a road distance for a directed site pair.
    ///
    /// Lookups fall back to the reverse direction, so a single entry covers
    /// both ways unless an asymmetric route is configured explicitly.
    pub fn set_distance(&mut self, from: SitePoint, to: SitePoint, km: f64) {
        self.distances.insert((from, to), km);
    }

    pub fn set_coordinates(&mut self, site: SitePoint, point: GeoPoint) {
        self.coordinates.insert(site, point);
    }

    pub fn coordinates(&self, site: SitePoint) -> Option<GeoPoint> {
        self.coordinates.get(&site).copied()
    }

    /// Road kilometres between two sites.
    ///
    /// The unloading→loading return has no direct road; it is the station
    /// detour driven empty, so it sums the two configured hops.
    pub fn distance_km(&self, from: SitePoint, to: SitePoint) -> f64 {
        if from == to {
            return 0.0;
        }
        if let Some(km) = self.distances.get(&(from, to)) {
            return *km;
        }
        // The empty run back from unloading has no direct road entry; it is
        // always driven past the station.
        if (from, to) == (SitePoint::Unloading, SitePoint::Loading) {
            return self.distance_km(SitePoint::Unloading, SitePoint::Swap)
                + self.distance_km(SitePoint::Swap, SitePoint::Loading);
        }
        if let Some(km) = self.distances.get(&(to, from)) {
            return *km;
        }
        match (self.coordinates(from), self.coordinates(to)) {
            (Some(a), Some(b)) => a.distance_km(&b),
            _ => 0.0,
        }
    }

    /// Total road kilometres for a segment, `0.0` for `Unknown`.
    pub fn segment_km(&self, segment: RouteSegment) -> f64 {
        match segment {
            RouteSegment::LoadingToUnloadingToSwap => {
                self.distance_km(SitePoint::Loading, SitePoint::Unloading)
                    + self.distance_km(SitePoint::Unloading, SitePoint::Swap)
            }
            other => match other.endpoints() {
                Some((from, to)) => self.distance_km(from, to),
                None => 0.0,
            },
        }
    }

    /// Which site a GPS fix belongs to, if any lies within the 100 m gate.
    ///
    /// The depot shares coordinates with the unloading yard, so the depot is
    /// never reported here; classification treats a fix there as unloading.
    pub fn nearest_site(&self, position: &GeoPoint) -> Option<SitePoint> {
        let candidates = [SitePoint::Loading, SitePoint::Unloading, SitePoint::Swap];
        let mut best: Option<(SitePoint, f64)> = None;
        for site in candidates {
            let Some(coord) = self.coordinates(site) else {
                continue;
            };
            let d = position.distance_m(&coord);
            if d <= SITE_THRESHOLD_M {
                match best {
                    Some((_, prev)) if prev <= d => {}
                    _ => best = Some((site, d)),
                }
            }
        }
        best.map(|(site, _)| site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_corridor_distances() {
        let map = SiteMap::default();
        assert_eq!(map.distance_km(SitePoint::Start, SitePoint::Loading), 21.3);
        assert_eq!(map.distance_km(SitePoint::Loading, SitePoint::Unloading), 21.3);
        assert_eq!(map.distance_km(SitePoint::Unloading, SitePoint::Swap), 13.7);
        assert_eq!(map.distance_km(SitePoint::Swap, SitePoint::Loading), 7.6);
        assert_eq!(map.distance_km(SitePoint::Loading, SitePoint::Loading), 0.0);
    }

    #[test]
    fn empty_return_sums_station_detour_hops() {
        let map = SiteMap::default();
        let km = map.distance_km(SitePoint::Unloading, SitePoint::Loading);
        assert!((km - (13.7 + 7.6)).abs() < 1e-9);
    }

    #[test]
    fn composite_segment_spans_both_hops() {
        let map = SiteMap::default();
        let km = map.segment_km(RouteSegment::LoadingToUnloadingToSwap);
        assert!((km - (21.3 + 13.7)).abs() < 1e-9);
        assert_eq!(map.segment_km(RouteSegment::Unknown), 0.0);
    }

    #[test]
    fn nearest_site_respects_the_hundred_metre_gate() {
        let map = SiteMap::default();
        let at_loading = map.coordinates(SitePoint::Loading).unwrap();
        assert_eq!(map.nearest_site(&at_loading), Some(SitePoint::Loading));

        let mid_corridor = GeoPoint::new(21.39, 110.10);
        assert_eq!(map.nearest_site(&mid_corridor), None);
    }

    #[test]
    fn missing_table_entry_falls_back_to_haversine() {
        let mut map = SiteMap::default();
        map.set_coordinates(SitePoint::Start, GeoPoint::new(21.45, 110.20));
        map.distances
            .shift_remove(&(SitePoint::Start, SitePoint::Loading));
        let km = map.distance_km(SitePoint::Start, SitePoint::Loading);
        assert!(km > 0.0);
    }
}
