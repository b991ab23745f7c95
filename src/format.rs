//! Time, duration, and currency formatting shared by the simulator and planner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Placeholder shown when a derived value is undefined (e.g. zero power draw).
pub const NO_VALUE: &str = "—";

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Error returned when an `"HH:MM"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid clock time \"{input}\": expected HH:MM")]
pub struct TimeParseError {
    /// The rejected input.
    pub input: String,
}

/// A wall-clock time of day with minute precision.
///
/// Arithmetic wraps at midnight, so `23:50 + 20min` is `00:10`.
///
/// # Examples
///
/// ```
/// use b2h_sim::format::ClockTime;
///
/// let t: ClockTime = "14:30".parse().unwrap();
/// assert_eq!(t.add_minutes(68).to_string(), "15:38");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    minutes_of_day: u16,
}

impl ClockTime {
    /// Creates a time from hour and minute, wrapping out-of-range values.
    pub fn new(hour: u32, minute: u32) -> Self {
        Self::from_total_minutes(i64::from(hour) * 60 + i64::from(minute))
    }

    fn from_total_minutes(total: i64) -> Self {
        let wrapped = total.rem_euclid(MINUTES_PER_DAY);
        Self {
            minutes_of_day: wrapped as u16,
        }
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes_of_day / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes_of_day % 60)
    }

    /// Minutes elapsed since midnight.
    pub fn minutes_of_day(self) -> u32 {
        u32::from(self.minutes_of_day)
    }

    /// Returns this time shifted by `minutes`, wrapping at 24h in both directions.
    #[must_use]
    pub fn add_minutes(self, minutes: i64) -> Self {
        Self::from_total_minutes(i64::from(self.minutes_of_day) + minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError {
            input: s.to_string(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        if hour > 23 || minute > 59 {
            return Err(err());
        }
        Ok(Self::new(hour, minute))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Formats a minute count as `"1h 08m"`, or `"45min"` below one hour.
pub fn minutes_to_time_string(minutes: u32) -> String {
    let h = minutes / 60;
    let m = minutes % 60;
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}min")
    }
}

/// Adds `minutes` to an `"HH:MM"` string: `("14:30", 68)` gives `"15:38"`.
///
/// # Errors
///
/// Returns a [`TimeParseError`] if `base` is not a valid `"HH:MM"` time.
pub fn add_minutes_to_time(base: &str, minutes: i64) -> Result<String, TimeParseError> {
    let time: ClockTime = base.parse()?;
    Ok(time.add_minutes(minutes).to_string())
}

/// Formats an amount in whole currency units with thousands separators.
///
/// `14560` gives `"14,560"`.
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats a duration in seconds as `"2h 05m"` or `"7m"`; non-positive gives [`NO_VALUE`].
pub fn format_duration_hm(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds <= 0.0 {
        return NO_VALUE.to_string();
    }
    let secs = total_seconds as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m")
    }
}

/// Rounds `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_over_an_hour_are_zero_padded() {
        assert_eq!(minutes_to_time_string(68), "1h 08m");
        assert_eq!(minutes_to_time_string(120), "2h 00m");
    }

    #[test]
    fn minutes_under_an_hour_use_min_suffix() {
        assert_eq!(minutes_to_time_string(45), "45min");
        assert_eq!(minutes_to_time_string(0), "0min");
    }

    #[test]
    fn add_minutes_simple() {
        assert_eq!(add_minutes_to_time("14:30", 68).ok().as_deref(), Some("15:38"));
    }

    #[test]
    fn add_minutes_wraps_past_midnight() {
        assert_eq!(add_minutes_to_time("23:50", 20).ok().as_deref(), Some("00:10"));
        assert_eq!(add_minutes_to_time("23:59", 1).ok().as_deref(), Some("00:00"));
    }

    #[test]
    fn add_negative_minutes_wraps_backwards() {
        assert_eq!(add_minutes_to_time("00:05", -10).ok().as_deref(), Some("23:55"));
    }

    #[test]
    fn malformed_time_is_rejected() {
        assert!(add_minutes_to_time("1430", 5).is_err());
        assert!(add_minutes_to_time("25:00", 5).is_err());
        assert!(add_minutes_to_time("ab:cd", 5).is_err());
    }

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(14560), "14,560");
        assert_eq!(format_currency(999), "999");
        assert_eq!(format_currency(1_000), "1,000");
        assert_eq!(format_currency(1_234_567), "1,234,567");
        assert_eq!(format_currency(-2500), "-2,500");
        assert_eq!(format_currency(0), "0");
    }

    #[test]
    fn duration_hm() {
        assert_eq!(format_duration_hm(3_900.0), "1h 05m");
        assert_eq!(format_duration_hm(420.0), "7m");
        assert_eq!(format_duration_hm(0.0), NO_VALUE);
        assert_eq!(format_duration_hm(f64::INFINITY), NO_VALUE);
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(2.345_6, 2), 2.35);
        assert_eq!(round_to(28.44, 1), 28.4);
        assert_eq!(round_to(7.5, 0), 8.0);
    }

    #[test]
    fn clock_time_serde_as_string() {
        #[derive(Deserialize, Serialize)]
        struct Wrap {
            t: ClockTime,
        }
        let w: Wrap = toml::from_str("t = \"09:05\"").unwrap();
        assert_eq!(w.t, ClockTime::new(9, 5));
        assert_eq!(toml::to_string(&w).unwrap().trim(), "t = \"09:05\"");
    }
}
