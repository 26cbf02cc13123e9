//! ---
//! evd_section: "05-route-classification"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "GPS-history route classification."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use evd_geo::{RouteSegment, SiteMap, SitePoint};
use serde::{Deserialize, Serialize};

/// Classification result for one truck at one instant.
///
/// Produced fresh on every classification, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub truck_id: String,
    pub segment: RouteSegment,
    pub start: SitePoint,
    pub target: SitePoint,
    pub total_km: f64,
    pub remaining_km: f64,
    /// How sure the classifier is about the segment, [0, 1].
    pub confidence: f64,
    /// SOC reported with the latest frame, if the unit sent one.
    pub soc: Option<f64>,
    pub capacity_kwh: f64,
}

impl RouteInfo {
    /// Fraction of the leg still ahead, clamped to [0, 1].
    pub fn remaining_fraction(&self) -> f64 {
        if self.total_km > 0.0 {
            (self.remaining_km / self.total_km).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Fraction of the leg already driven.
    pub fn progress(&self) -> f64 {
        1.0 - self.remaining_fraction()
    }

    /// Start and target sites for a segment.
    pub fn endpoints_of(segment: RouteSegment) -> (SitePoint, SitePoint) {
        segment
            .endpoints()
            .unwrap_or((SitePoint::Start, SitePoint::Loading))
    }

    /// A default route for a truck we know nothing about: assumed to be on
    /// its way from the depot to loading with the whole leg ahead.
    pub fn depot_default(truck_id: &str, capacity_kwh: f64, sites: &SiteMap) -> Self {
        let total_km = sites.distance_km(SitePoint::Start, SitePoint::Loading);
        Self {
            truck_id: truck_id.to_owned(),
            segment: RouteSegment::StartToLoading,
            start: SitePoint::Start,
            target: SitePoint::Loading,
            total_km,
            remaining_km: total_km,
            confidence: 0.3,
            soc: None,
            capacity_kwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_clamp_and_complement() {
        let mut info = RouteInfo::depot_default("t1", 282.0, &SiteMap::default());
        assert_eq!(info.remaining_fraction(), 1.0);
        assert_eq!(info.progress(), 0.0);

        info.remaining_km = info.total_km / 4.0;
        assert!((info.remaining_fraction() - 0.25).abs() < 1e-9);
        assert!((info.progress() - 0.75).abs() < 1e-9);

        info.remaining_km = info.total_km * 2.0;
        assert_eq!(info.remaining_fraction(), 1.0);
    }
}
