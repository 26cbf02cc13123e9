//! ---
//! evd_section: "06-swap-station"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Battery pool and swap station resource manager."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---
//! The battery swap station: a fixed pool of battery slots, a FIFO queue of
//! waiting trucks, the exchange ledger, and the electricity tariff calendar
//! that informs early or deferred swaps.

pub mod battery;
pub mod records;
pub mod station;
pub mod tariff;

pub use battery::Battery;
pub use records::ExchangeRecord;
pub use station::{SwapRequest, SwapStation};
pub use tariff::{should_delay_exchange, should_exchange_early, TariffPeriod};
