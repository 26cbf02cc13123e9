//! ---
//! evd_section: "01-core-functionality"
//! evd_subsection: "module"
//! evd_type: "source"
//! evd_scope: "code"
//! evd_description: "Shared primitives and utilities for the dispatch runtime."
//! evd_version: "v0.0.0-prealpha"
//! evd_owner: "tbd"
//! ---

/// Drive duration in whole minutes for a segment, truncating partial minutes.
///
/// Trucks report arrival on the minute boundary, so the fleet plan uses the
/// floored value rather than rounding up.
pub fn drive_minutes(distance_km: f64, speed_kmh: f64) -> i64 {
    if speed_kmh <= 0.0 {
        return 0;
    }
    (distance_km / speed_kmh * 60.0).floor() as i64
}

/// Round a value to two decimal places (kWh and SOC ledger precision).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_minutes_truncates() {
        // 21.3 km at 40 km/h is 31.95 min on paper, 31 on the board.
        assert_eq!(drive_minutes(21.3, 40.0), 31);
        assert_eq!(drive_minutes(13.7, 40.0), 20);
        assert_eq!(drive_minutes(7.6, 40.0), 11);
    }

    #[test]
    fn drive_minutes_handles_degenerate_speed() {
        assert_eq!(drive_minutes(10.0, 0.0), 0);
        assert_eq!(drive_minutes(10.0, -5.0), 0);
    }

    #[test]
    fn round2_keeps_ledger_precision() {
        // 0.125 scales to exactly 12.5, the true half-away-from-zero case.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(39.7612), 39.76);
        assert_eq!(round2(16.2532), 16.25);
        assert_eq!(round2(0.0), 0.0);
    }
}
