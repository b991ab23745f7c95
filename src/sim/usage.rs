//! B2H export budget and the low-runtime alert.

use serde::Serialize;

use super::types::BatterySnapshot;
use crate::format::round_to;

/// User-set cap on energy exported through the terminals.
///
/// Expressed as a share of pack capacity; it can never dip into the reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageLimit {
    /// Limit as percent of total capacity.
    pub percent: f64,
    /// Limit in kWh, rounded to 1 decimal.
    pub kwh: f64,
}

impl UsageLimit {
    /// Builds a limit from a requested percent, clamped to `[0, soc - reserve]`.
    pub fn clamped(requested_percent: f64, battery: &BatterySnapshot) -> Self {
        let percent = requested_percent.min(max_limit_percent(battery)).max(0.0);
        Self {
            percent,
            kwh: round_to(percent / 100.0 * battery.total_capacity_kwh, 1),
        }
    }

    /// Whether `exported_kwh` has reached the limit.
    pub fn is_reached(&self, exported_kwh: f64) -> bool {
        exported_kwh >= self.kwh
    }
}

/// Largest admissible limit for the current battery state (%).
pub fn max_limit_percent(battery: &BatterySnapshot) -> f64 {
    (battery.soc - battery.reserve_percent).max(0.0)
}

/// Runtime warning shown while at least one terminal is exporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageAlert {
    /// Remaining runtime at the current draw, e.g. `"3h 20m"`.
    pub remaining_time: String,
    /// Wall-clock time the reserve floor is reached, `"HH:MM"`.
    pub depletion_time: String,
}
