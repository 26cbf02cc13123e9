//! ---
//! evd_section: "05-route-classification"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "GPS-history route classification."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! Route classification: infer which corridor leg a truck is on from its
//! recent GPS history, with a confidence score and the remaining distance on
//! the leg.

pub mod classifier;
pub mod route_info;

pub use classifier::RouteClassifier;
pub use route_info::RouteInfo;
