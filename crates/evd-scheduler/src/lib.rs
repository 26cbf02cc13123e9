//! ---
//! evd_section: "07-dispatch-scheduler"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Discrete-event fleet dispatch simulation."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! The dispatch core: trucks haul cargo over the loading/unloading corridor
//! in repeated cycles, detouring through the swap station whenever the
//! energy model says the next cycle is not covered. The simulation is
//! single-threaded and driven by one synthetic clock; trucks are processed
//! in departure-time order each round.

pub mod records;
pub mod simulation;
pub mod truck;

pub use records::ScheduleRecord;
pub use simulation::DispatchSimulation;
pub use truck::Truck;
