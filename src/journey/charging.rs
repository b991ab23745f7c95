//! Tiered charging-rate model.
//!
//! Charging slows as the pack fills: the effective power is the station's
//! nominal power scaled by a factor that depends on the SOC band being
//! charged through.

/// SOC bands `[low, high)` and the fraction of nominal power delivered inside each.
pub const CHARGE_BANDS: [(f64, f64, f64); 3] =
    [(0.0, 80.0, 0.8), (80.0, 90.0, 0.4), (90.0, 100.0, 0.15)];

/// Exact charging time (minutes) from `from_soc` to `to_soc`.
///
/// Returns 0 when `to_soc <= from_soc`. Bands with no effective power are skipped.
///
/// # Examples
///
/// ```
/// use b2h_sim::journey::charging::charging_minutes;
///
/// // 10 points below 80% at 100 kW on an 80 kWh pack: 8 kWh at 80 kW = 6 min
/// assert!((charging_minutes(70.0, 80.0, 100.0, 80.0) - 6.0).abs() < 1e-9);
/// ```
pub fn charging_minutes(from_soc: f64, to_soc: f64, max_power_kw: f64, capacity_kwh: f64) -> f64 {
    if to_soc <= from_soc {
        return 0.0;
    }

    CHARGE_BANDS
        .iter()
        .map(|&(low, high, factor)| {
            let start = from_soc.max(low);
            let end = to_soc.min(high);
            let effective_kw = max_power_kw * factor;
            if end <= start || effective_kw <= 0.0 {
                return 0.0;
            }
            let kwh = (end - start) / 100.0 * capacity_kwh;
            kwh / effective_kw * 60.0
        })
        .sum()
}

/// Charging time rounded to whole minutes.
pub fn calc_charging_duration(
    from_soc: f64,
    to_soc: f64,
    max_power_kw: f64,
    capacity_kwh: f64,
) -> u32 {
    charging_minutes(from_soc, to_soc, max_power_kw, capacity_kwh).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_charge_needed() {
        assert_eq!(calc_charging_duration(80.0, 80.0, 350.0, 80.0), 0);
        assert_eq!(calc_charging_duration(85.0, 60.0, 350.0, 80.0), 0);
    }

    #[test]
    fn single_band_at_superfast() {
        // 52 points = 41.6 kWh at 280 kW effective
        let exact = charging_minutes(28.0, 80.0, 350.0, 80.0);
        assert!((exact - 41.6 / 280.0 * 60.0).abs() < 1e-9);
        assert_eq!(calc_charging_duration(28.0, 80.0, 350.0, 80.0), 9);
    }

    #[test]
    fn taper_above_eighty() {
        // 75 -> 95 at 100 kW, 80 kWh:
        // 4 kWh @ 80 kW = 3 min, 8 kWh @ 40 kW = 12 min, 4 kWh @ 15 kW = 16 min
        let exact = charging_minutes(75.0, 95.0, 100.0, 80.0);
        assert!((exact - 31.0).abs() < 1e-9);
        assert_eq!(calc_charging_duration(75.0, 95.0, 100.0, 80.0), 31);
    }

    #[test]
    fn zero_power_never_divides() {
        assert_eq!(charging_minutes(20.0, 90.0, 0.0, 80.0), 0.0);
    }

    #[test]
    fn higher_target_never_faster() {
        let mut last = 0.0;
        for target in 30..=100 {
            let m = charging_minutes(30.0, target as f64, 200.0, 80.0);
            assert!(m >= last);
            last = m;
        }
    }
}
