//! ---
//! evd_section: "02-geography"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Static geography for the dispatch corridor."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! Static geography for the dispatch corridor: the four fixed sites, the
//! distance table between them, haversine math, and the route segment
//! vocabulary used by the classifier and the energy model.

pub mod point;
pub mod segment;
pub mod sites;

pub use point::{normalize_angle_deg, GeoPoint};
pub use segment::RouteSegment;
pub use sites::{SiteMap, SitePoint};
