//! ---
//! evd_section: "02-geography"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Static geography for the dispatch corridor."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use serde::{Deserialize, Serialize};

use crate::sites::SitePoint;

/// A leg of the fixed haul corridor between two known sites.
///
/// `LoadingToUnloadingToSwap` is the one composite leg: the truck delivers
/// first and continues to the battery station without returning to loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RouteSegment {
    StartToLoading,
    LoadingToUnloading,
    LoadingToUnloadingToSwap,
    UnloadingToSwap,
    SwapToLoading,
    UnloadingToLoading,
    #[default]
    Unknown,
}

impl RouteSegment {
    /// Start and target sites for the leg; `None` for `Unknown`.
    ///
    /// The composite leg reports its final target (the swap station); its
    /// intermediate stop is resolved by the distance table.
    pub fn endpoints(&self) -> Option<(SitePoint, SitePoint)> {
        match self {
            RouteSegment::StartToLoading => Some((SitePoint::Start, SitePoint::Loading)),
            RouteSegment::LoadingToUnloading => Some((SitePoint::Loading, SitePoint::Unloading)),
            RouteSegment::LoadingToUnloadingToSwap => Some((SitePoint::Loading, SitePoint::Swap)),
            RouteSegment::UnloadingToSwap => Some((SitePoint::Unloading, SitePoint::Swap)),
            RouteSegment::SwapToLoading => Some((SitePoint::Swap, SitePoint::Loading)),
            RouteSegment::UnloadingToLoading => Some((SitePoint::Unloading, SitePoint::Loading)),
            RouteSegment::Unknown => None,
        }
    }

    /// Whether the truck carries cargo on this leg.
    ///
    /// Only the delivery run out of loading is laden; every other leg is a
    /// reposition with an empty bed.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            RouteSegment::LoadingToUnloading | RouteSegment::LoadingToUnloadingToSwap
        )
    }

    /// Human-oriented label used in schedule summaries.
    pub fn describe(&self) -> &'static str {
        match self {
            RouteSegment::StartToLoading => "depot to loading",
            RouteSegment::LoadingToUnloading => "loading to unloading",
            RouteSegment::LoadingToUnloadingToSwap => "loading via unloading to station",
            RouteSegment::UnloadingToSwap => "unloading to station",
            RouteSegment::SwapToLoading => "station to loading",
            RouteSegment::UnloadingToLoading => "unloading back to loading",
            RouteSegment::Unknown => "unknown",
        }
    }
}
