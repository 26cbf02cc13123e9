//! ---
//! evd_section: "06-swap-station"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Battery pool and swap station resource manager."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Electricity tariff bands over the day.
///
/// Valley 00–08, normal 08–10 / 12–14 / 19–24, peak 10–12, sharp 14–19.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TariffPeriod {
    Valley,
    Normal,
    Peak,
    Sharp,
}

impl TariffPeriod {
    pub fn at(time: DateTime<Utc>) -> Self {
        match time.hour() {
            0..=7 => TariffPeriod::Valley,
            8..=9 | 12..=13 | 19..=23 => TariffPeriod::Normal,
            10..=11 => TariffPeriod::Peak,
            _ => TariffPeriod::Sharp,
        }
    }

    /// Relative price per kWh used to weigh swap timing decisions.
    pub fn price_per_kwh(&self) -> f64 {
        match self {
            TariffPeriod::Valley => 0.3,
            TariffPeriod::Normal => 0.6,
            TariffPeriod::Peak => 0.8,
            TariffPeriod::Sharp => 1.0,
        }
    }

    /// Cheap enough to charge in: at or below the normal-band price.
    pub fn is_low(&self) -> bool {
        self.price_per_kwh() <= TariffPeriod::Normal.price_per_kwh()
    }
}

/// Swap now rather than after the next trip: the grid is cheap now and will
/// be expensive when the trip ends.
pub fn should_exchange_early(now: DateTime<Utc>, projected: DateTime<Utc>) -> bool {
    TariffPeriod::at(now).is_low() && !TariffPeriod::at(projected).is_low()
}

/// Hold the swap until after the next trip: the grid is expensive now and
/// cheap when the trip ends.
pub fn should_delay_exchange(now: DateTime<Utc>, projected: DateTime<Utc>) -> bool {
    !TariffPeriod::at(now).is_low() && TariffPeriod::at(projected).is_low()
}
