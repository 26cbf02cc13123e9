//! ---
//! evd_section: "05-route-classification"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "GPS-history route classification."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use std::sync::Arc;

use chrono::Duration;
use evd_energy::Calibrator;
use evd_geo::{normalize_angle_deg, GeoPoint, RouteSegment, SiteMap, SitePoint};
use evd_telemetry::{TelemetryFeed, TelemetryFrame};
use tracing::{debug, warn};

use crate::route_info::RouteInfo;

/// Trailing history window inspected per classification.
const HISTORY_WINDOW_MINUTES: i64 = 30;
/// A shorter record than this cannot distinguish legs.
const MIN_SPAN_MINUTES: i64 = 20;
/// Heading must agree with a candidate bearing within this gate to override.
const BEARING_GATE_DEG: f64 = 45.0;

/// Site label for one GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiteLabel {
    Loading,
    Unloading,
    Swap,
    InTransit,
}

/// Infers which corridor leg a truck is on from its GPS history.
///
/// Classification never fails: with no telemetry at all the truck is assumed
/// to be on the depot→loading leg at low confidence. After every
/// classification the consumption calibrator runs opportunistically.
pub struct RouteClassifier {
    feed: Arc<dyn TelemetryFeed>,
    sites: Arc<SiteMap>,
    calibrator: Calibrator,
}

impl RouteClassifier {
    pub fn new(feed: Arc<dyn TelemetryFeed>, sites: Arc<SiteMap>, calibrator: Calibrator) -> Self {
        Self { feed, sites, calibrator }
    }

    pub fn classify(&self, truck_id: &str, capacity_kwh: f64) -> RouteInfo {
        let Some(current) = self.feed.current(truck_id) else {
            warn!(truck = truck_id, "no telemetry, assuming the depot leg");
            return RouteInfo::depot_default(truck_id, capacity_kwh, &self.sites);
        };

        let history = self.feed.history(truck_id, HISTORY_WINDOW_MINUTES);
        if history.is_empty() {
            debug!(truck = truck_id, "no history in the window, assuming the depot leg");
            let mut info = RouteInfo::depot_default(truck_id, capacity_kwh, &self.sites);
            info.soc = current.soc;
            info.remaining_km = self.project_remaining(&current.position, info.start, info.target, info.total_km);
            self.calibrator.update_from_route(truck_id, info.segment, info.progress());
            return info;
        }

        let span = history[history.len() - 1].report_time - history[0].report_time;
        let segment = if span < Duration::minutes(MIN_SPAN_MINUTES) {
            debug!(truck = truck_id, span_min = span.num_minutes(), "history span too short");
            RouteSegment::StartToLoading
        } else {
            self.detect(&current, &history)
        };

        let (start, target) = RouteInfo::endpoints_of(segment);
        let total_km = self.sites.segment_km(segment);
        let remaining_km = self.project_remaining(&current.position, start, target, total_km);

        let info = RouteInfo {
            truck_id: truck_id.to_owned(),
            segment,
            start,
            target,
            total_km,
            remaining_km,
            confidence: Self::score(&history, segment),
            soc: current.soc,
            capacity_kwh,
        };

        debug!(
            truck = truck_id,
            segment = segment.describe(),
            remaining_km = info.remaining_km,
            confidence = info.confidence,
            "route classified"
        );
        self.calibrator.update_from_route(truck_id, segment, info.progress());
        info
    }

    fn label(&self, position: &GeoPoint) -> SiteLabel {
        match self.sites.nearest_site(position) {
            Some(SitePoint::Loading) => SiteLabel::Loading,
            Some(SitePoint::Unloading) | Some(SitePoint::Start) => SiteLabel::Unloading,
            Some(SitePoint::Swap) => SiteLabel::Swap,
            None => SiteLabel::InTransit,
        }
    }

    fn detect(&self, current: &TelemetryFrame, history: &[TelemetryFrame]) -> RouteSegment {
        let mut labels: Vec<SiteLabel> = Vec::new();
        for frame in history {
            let label = self.label(&frame.position);
            if labels.last() != Some(&label) {
                labels.push(label);
            }
        }
        labels.push(self.label(&current.position));

        let mut segment = Self::infer_from_labels(&labels);
        if history.len() >= 2 {
            segment = self.validate_with_bearing(segment, current, history);
        }
        segment
    }

    /// Transition table over the last two de-duplicated labels.
    fn infer_from_labels(labels: &[SiteLabel]) -> RouteSegment {
        use SiteLabel::*;

        if labels.len() < 2 {
            return RouteSegment::StartToLoading;
        }
        let prev = labels[labels.len() - 2];
        let last = labels[labels.len() - 1];

        match (prev, last) {
            (Loading, InTransit | Unloading) => RouteSegment::LoadingToUnloading,
            (Unloading, InTransit | Swap) => RouteSegment::UnloadingToSwap,
            (Swap, InTransit | Loading) => RouteSegment::SwapToLoading,
            (Unloading, Loading) => RouteSegment::UnloadingToLoading,
            _ if last == InTransit => Self::walk_back(labels),
            _ => RouteSegment::StartToLoading,
        }
    }

    /// The label tail is all in-transit: walk back at most three labels to
    /// the last anchored site. An unloading anchor is ambiguous, the truck
    /// may be heading for the station or already past it; an earlier swap
    /// label means the battery is fresh and the truck is going home.
    fn walk_back(labels: &[SiteLabel]) -> RouteSegment {
        use SiteLabel::*;

        let n = labels.len();
        let stop = n.saturating_sub(4);
        for i in (stop..n.saturating_sub(1)).rev() {
            match labels[i] {
                Loading => return RouteSegment::LoadingToUnloading,
                Unloading => {
                    return if labels.contains(&Swap) {
                        RouteSegment::UnloadingToLoading
                    } else {
                        RouteSegment::UnloadingToSwap
                    };
                }
                Swap => return RouteSegment::SwapToLoading,
                InTransit => {}
            }
        }
        RouteSegment::StartToLoading
    }

    /// Cross-check the preliminary segment against the actual heading.
    ///
    /// Candidates are checked in a fixed order (unloading, station, loading)
    /// and the first minimum wins, so exact ties resolve deterministically.
    fn validate_with_bearing(
        &self,
        preliminary: RouteSegment,
        current: &TelemetryFrame,
        history: &[TelemetryFrame],
    ) -> RouteSegment {
        // The current frame may itself be the newest history entry; anchor
        // the heading on the last strictly earlier sample.
        let Some(anchor) = history
            .iter()
            .rev()
            .find(|f| f.report_time < current.report_time)
        else {
            return preliminary;
        };
        let heading = anchor.position.bearing_deg(&current.position);

        let candidates = [SitePoint::Unloading, SitePoint::Swap, SitePoint::Loading];
        let mut best: Option<(f64, SitePoint)> = None;
        for site in candidates {
            let Some(coord) = self.sites.coordinates(site) else {
                continue;
            };
            let diff = normalize_angle_deg(heading - current.position.bearing_deg(&coord)).abs();
            if best.map_or(true, |(d, _)| diff < d) {
                best = Some((diff, site));
            }
        }

        match best {
            Some((diff, site)) if diff < BEARING_GATE_DEG => match site {
                SitePoint::Unloading => RouteSegment::LoadingToUnloading,
                SitePoint::Swap => RouteSegment::UnloadingToSwap,
                // A loading-bound heading fits both return legs; trust the
                // label history on which one it is.
                _ => {
                    if preliminary == RouteSegment::UnloadingToLoading {
                        preliminary
                    } else {
                        RouteSegment::SwapToLoading
                    }
                }
            },
            _ => preliminary,
        }
    }

    /// Remaining road distance on the leg, from a straight-line projection
    /// of the current position scaled to the nominal leg length.
    fn project_remaining(
        &self,
        position: &GeoPoint,
        start: SitePoint,
        target: SitePoint,
        total_km: f64,
    ) -> f64 {
        let (Some(start_c), Some(target_c)) =
            (self.sites.coordinates(start), self.sites.coordinates(target))
        else {
            return total_km;
        };
        let straight_m = start_c.distance_m(&target_c);
        if straight_m <= f64::EPSILON {
            return total_km;
        }

        let mut remaining_m = position.distance_m(&target_c);
        if remaining_m >= straight_m {
            // Beyond the chord; measure from the start side instead.
            remaining_m = straight_m - start_c.distance_m(position);
        }
        (remaining_m / straight_m * total_km).clamp(0.0, total_km)
    }

    /// Confidence: base 0.5, up to 0.3 for track volume, up to 0.2 for
    /// sample regularity (best at 30 s spacing, gaps over 5 min ignored),
    /// plus 0.2 when the segment is known.
    fn score(history: &[TelemetryFrame], segment: RouteSegment) -> f64 {
        let mut confidence = 0.5;
        confidence += (history.len() as f64 / 40.0 * 0.3).min(0.3);
        if history.len() >= 2 {
            confidence += Self::continuity(history) * 0.2;
        }
        if segment != RouteSegment::Unknown {
            confidence += 0.2;
        }
        confidence.clamp(0.0, 1.0)
    }

    fn continuity(history: &[TelemetryFrame]) -> f64 {
        let mut total = 0.0;
        let mut valid = 0u32;
        for pair in history.windows(2) {
            let gap = (pair[1].report_time - pair[0].report_time).num_seconds();
            if gap > 0 && gap < 300 {
                total += gap as f64;
                valid += 1;
            }
        }
        if valid == 0 {
            return 0.0;
        }
        let average = total / f64::from(valid);
        (1.0 - (average - 30.0).abs() / 30.0).max(0.0)
    }
}
