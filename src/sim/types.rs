//! Core simulation types: timing configuration, terminal and battery state, tick records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::RampTiming;
use crate::format::round_to;

/// Centralized timing configuration for the power simulator.
///
/// # Examples
///
/// ```
/// use b2h_sim::channels::RampTiming;
/// use b2h_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2000, RampTiming::default(), 60, 42);
/// assert_eq!(cfg.tick_sec, 2.0);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Tick period in seconds, derived as `tick_interval_ms / 1000`.
    pub tick_sec: f64,
    /// Ramp durations, independent of the tick length.
    #[serde(skip)]
    pub ramp: RampTiming,
    /// Number of samples kept per channel history.
    pub history_max: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new simulator configuration.
    ///
    /// # Panics
    ///
    /// Panics if `tick_interval_ms` or `history_max` is zero.
    pub fn new(tick_interval_ms: u64, ramp: RampTiming, history_max: usize, seed: u64) -> Self {
        assert!(tick_interval_ms > 0, "tick_interval_ms must be > 0");
        assert!(history_max > 0, "history_max must be > 0");
        Self {
            tick_interval_ms,
            tick_sec: tick_interval_ms as f64 / 1000.0,
            ramp,
            history_max,
            seed,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(2000, RampTiming::default(), 60, 42)
    }
}

/// One of the two export terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ac,
    Dc,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Ac, Channel::Dc];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ac => f.write_str("ac"),
            Self::Dc => f.write_str("dc"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ac" => Ok(Self::Ac),
            "dc" => Ok(Self::Dc),
            other => Err(format!("unknown channel \"{other}\", expected \"ac\" or \"dc\"")),
        }
    }
}

/// Nameplate data of a terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalSpec {
    pub voltage_v: f64,
    pub frequency_hz: Option<f64>,
    pub max_power_kw: f64,
}

/// Live state of one export terminal.
///
/// `cumulative_energy_kwh` keeps growing while a ramp-down is still
/// delivering power after switch-off; `usage_duration_secs` only grows while
/// the terminal is switched on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Terminal {
    pub channel: Channel,
    pub is_on: bool,
    pub current_power_kw: f64,
    pub max_power_kw: f64,
    pub cumulative_energy_kwh: f64,
    pub usage_duration_secs: f64,
    pub voltage_v: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<f64>,
}

impl Terminal {
    /// Creates a switched-off terminal with zeroed counters.
    pub fn new(channel: Channel, spec: TerminalSpec) -> Self {
        Self {
            channel,
            is_on: false,
            current_power_kw: 0.0,
            max_power_kw: spec.max_power_kw,
            cumulative_energy_kwh: 0.0,
            usage_duration_secs: 0.0,
            voltage_v: spec.voltage_v,
            frequency_hz: spec.frequency_hz,
        }
    }

    /// Applies one tick of output to the counters.
    ///
    /// # Arguments
    ///
    /// * `power_kw` - Rounded power delivered this tick
    /// * `active` - Whether the terminal is on or still ramping down
    /// * `tick_sec` - Tick length in seconds
    pub fn record(&mut self, power_kw: f64, active: bool, tick_sec: f64) {
        self.current_power_kw = power_kw;
        if active {
            self.cumulative_energy_kwh += power_kw * tick_sec / 3600.0;
        }
        if self.is_on {
            self.usage_duration_secs += tick_sec;
        }
    }
}

/// Static battery parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySpec {
    pub total_capacity_kwh: f64,
    /// SOC floor reserved for the return trip (%).
    pub reserve_percent: f64,
    /// SOC at session start (%).
    pub initial_soc: f64,
    /// Driving range per SOC percent (km).
    pub km_per_soc: f64,
}

impl Default for BatterySpec {
    fn default() -> Self {
        Self {
            total_capacity_kwh: 80.0,
            reserve_percent: 25.0,
            initial_soc: 72.0,
            km_per_soc: 2.05,
        }
    }
}

impl BatterySpec {
    /// Derives the battery state after `energy_drawn_kwh` has left the pack.
    ///
    /// SOC is held within `[reserve_percent, 100]`.
    pub fn snapshot_after(&self, energy_drawn_kwh: f64) -> BatterySnapshot {
        let raw = self.initial_soc - energy_drawn_kwh / self.total_capacity_kwh * 100.0;
        let soc = round_to(raw.max(self.reserve_percent).min(100.0), 2);
        BatterySnapshot {
            soc,
            total_capacity_kwh: self.total_capacity_kwh,
            reserve_percent: self.reserve_percent,
            estimated_range_km: round_to(soc * self.km_per_soc, 1).max(0.0),
        }
    }
}

/// Battery state derived each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatterySnapshot {
    /// State of charge (%), within `[reserve_percent, 100]`.
    pub soc: f64,
    pub total_capacity_kwh: f64,
    pub reserve_percent: f64,
    pub estimated_range_km: f64,
}

impl BatterySnapshot {
    /// Energy above the reserve floor (kWh, >= 0).
    pub fn usable_energy_kwh(&self) -> f64 {
        ((self.soc - self.reserve_percent) / 100.0 * self.total_capacity_kwh).max(0.0)
    }
}

/// One point of a channel's power history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSample {
    pub time: DateTime<Utc>,
    pub power_kw: f64,
}

/// Complete record of one simulation tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Tick index, starting at 0.
    pub tick: u64,
    pub time: DateTime<Utc>,
    pub ac_phase: &'static str,
    pub ac_kw: f64,
    pub ac_on: bool,
    pub dc_phase: &'static str,
    pub dc_kw: f64,
    pub dc_on: bool,
    /// `ac_kw + dc_kw`, rounded to 2 decimals.
    pub total_kw: f64,
    /// Battery SOC after this tick (%).
    pub soc: f64,
    pub range_km: f64,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} {} | AC {:<9} {:>5.2} kW | DC {:<14} {:>5.2} kW | total={:>5.2} kW \
             | SoC={:>6.2}% range={:>5.1} km",
            self.tick,
            self.time.format("%H:%M:%S"),
            self.ac_phase,
            self.ac_kw,
            self.dc_phase,
            self.dc_kw,
            self.total_kw,
            self.soc,
            self.range_km,
        )
    }
}
