//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::channels::{AcChannel, AcProfile, DcChannel, DcProfile, RampTiming};
use crate::format::ClockTime;
use crate::journey::{
    B2hState, BasePlan, ChargerType, ChargingStation, Endpoint, JourneyPlanner, PlannerParams,
    RouteInfo, RouteLocation,
};
use crate::sim::clock::SimClock;
use crate::sim::{BatterySpec, Channel, PowerSimulator, SimConfig, TerminalSpec};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the `demo` preset. Load from TOML
/// with [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::demo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Tick timing, session length and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Traction battery parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// AC outlet nameplate and power envelope.
    #[serde(default)]
    pub ac: AcConfig,
    /// DC outlet nameplate and duty cycle.
    #[serde(default)]
    pub dc: DcConfig,
    /// Scripted toggle commands.
    #[serde(default = "default_toggles")]
    pub toggles: Vec<ToggleConfig>,
    /// Route, consumption constants and station catalog.
    #[serde(default)]
    pub journey: JourneyConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            battery: BatteryConfig::default(),
            ac: AcConfig::default(),
            dc: DcConfig::default(),
            toggles: default_toggles(),
            journey: JourneyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Tick period (ms, must be > 0).
    pub tick_interval_ms: u64,
    pub ramp_up_secs: f64,
    pub ramp_down_secs: f64,
    /// Samples kept per channel history (must be > 0).
    pub history_max: usize,
    /// Ticks to run in a scripted session.
    pub ticks: u64,
    /// Master random seed.
    pub seed: u64,
    /// Session start, RFC 3339.
    pub start_time: String,
    /// Local wall-clock offset from UTC (minutes).
    pub utc_offset_minutes: i32,
    /// B2H export budget set before the first tick (% of capacity).
    pub usage_limit_percent: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            ramp_up_secs: 2.0,
            ramp_down_secs: 2.0,
            history_max: 60,
            ticks: 90,
            seed: 42,
            start_time: "2025-06-01T05:30:00Z".to_string(),
            utc_offset_minutes: 540,
            usage_limit_percent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub total_capacity_kwh: f64,
    /// SOC floor (%).
    pub reserve_percent: f64,
    /// SOC at session start (%).
    pub initial_soc: f64,
    /// Range per SOC percent (km).
    pub km_per_soc: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            total_capacity_kwh: 80.0,
            reserve_percent: 25.0,
            initial_soc: 72.0,
            km_per_soc: 2.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcConfig {
    pub voltage: f64,
    pub frequency: f64,
    /// Nameplate limit (kW).
    pub max_power_kw: f64,
    /// Ramp-up target (kW).
    pub base_kw: f64,
    pub min_kw: f64,
    pub max_kw: f64,
    pub walk_delta_kw: f64,
}

impl Default for AcConfig {
    fn default() -> Self {
        Self {
            voltage: 220.0,
            frequency: 60.0,
            max_power_kw: 3.6,
            base_kw: 2.4,
            min_kw: 2.0,
            max_kw: 2.8,
            walk_delta_kw: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DcConfig {
    pub voltage: f64,
    /// Nameplate limit (kW).
    pub max_power_kw: f64,
    pub on_min_kw: f64,
    pub on_max_kw: f64,
    pub on_walk_delta_kw: f64,
    pub off_min_kw: f64,
    pub off_max_kw: f64,
    pub off_walk_delta_kw: f64,
    pub on_secs_min: f64,
    pub on_secs_max: f64,
    pub off_secs_min: f64,
    pub off_secs_max: f64,
    /// Power of the single tick at each compressor transition (kW).
    pub inrush_kw: f64,
}

impl Default for DcConfig {
    fn default() -> Self {
        let p = DcProfile::default();
        Self {
            voltage: 48.0,
            max_power_kw: 5.0,
            on_min_kw: p.on_min_kw,
            on_max_kw: p.on_max_kw,
            on_walk_delta_kw: p.on_walk_delta_kw,
            off_min_kw: p.off_min_kw,
            off_max_kw: p.off_max_kw,
            off_walk_delta_kw: p.off_walk_delta_kw,
            on_secs_min: p.on_secs_min,
            on_secs_max: p.on_secs_max,
            off_secs_min: p.off_secs_min,
            off_secs_max: p.off_secs_max,
            inrush_kw: p.inrush_kw,
        }
    }
}

/// A toggle applied just before tick `tick` executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleConfig {
    pub tick: u64,
    pub channel: Channel,
}

fn default_toggles() -> Vec<ToggleConfig> {
    vec![
        ToggleConfig {
            tick: 0,
            channel: Channel::Ac,
        },
        ToggleConfig {
            tick: 5,
            channel: Channel::Dc,
        },
        ToggleConfig {
            tick: 60,
            channel: Channel::Ac,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct B2hConfig {
    pub ac_on: bool,
    pub dc_on: bool,
    pub ac_kw: f64,
    pub dc_kw: f64,
}

impl Default for B2hConfig {
    fn default() -> Self {
        let b = B2hState::default();
        Self {
            ac_on: b.ac_on,
            dc_on: b.dc_on,
            ac_kw: b.ac_power_kw,
            dc_kw: b.dc_power_kw,
        }
    }
}

impl B2hConfig {
    pub fn to_state(&self) -> B2hState {
        B2hState {
            ac_on: self.ac_on,
            dc_on: self.dc_on,
            ac_power_kw: self.ac_kw,
            dc_power_kw: self.dc_kw,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JourneyConfig {
    pub origin_name: String,
    pub destination_name: String,
    pub departure_time: ClockTime,
    pub total_distance_km: f64,
    /// SOC on departure (%).
    pub origin_soc: f64,
    pub energy_per_km: f64,
    pub minutes_per_km: f64,
    pub default_target_soc: f64,
    pub soc_margin: f64,
    pub b2h_range_km_per_kwh: f64,
    /// B2H draw assumed when building the base itinerary.
    pub b2h: B2hConfig,
    /// Selected station ids, any order.
    pub selected: Vec<String>,
    pub stations: Vec<ChargingStation>,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        let p = PlannerParams::default();
        Self {
            origin_name: "Seoul".to_string(),
            destination_name: "Gangneung".to_string(),
            departure_time: ClockTime::new(14, 30),
            total_distance_km: 271.0,
            origin_soc: 72.0,
            energy_per_km: p.energy_per_km,
            minutes_per_km: p.minutes_per_km,
            default_target_soc: p.default_target_soc,
            soc_margin: p.soc_margin,
            b2h_range_km_per_kwh: p.b2h_range_km_per_kwh,
            b2h: B2hConfig::default(),
            selected: vec!["st-yeoju".to_string()],
            stations: default_catalog(),
        }
    }
}

#[expect(clippy::too_many_arguments)]
fn station(
    id: &str,
    name: &str,
    operator: &str,
    distance_km: f64,
    charger_type: ChargerType,
    max_power_kw: f64,
    price_per_kwh: f64,
    chargers: (u32, u32),
) -> ChargingStation {
    ChargingStation {
        id: id.to_string(),
        name: name.to_string(),
        operator: operator.to_string(),
        address: String::new(),
        distance_from_origin_km: distance_km,
        detour_distance_km: 0.0,
        charger_type,
        max_power_kw,
        available_chargers: chargers.0,
        total_chargers: chargers.1,
        waiting_count: 0,
        price_per_kwh,
        estimated_arrival_soc: None,
        estimated_charging_time_min: None,
        is_reachable: true,
        is_recommended: false,
    }
}

/// Stations along the built-in Seoul to Gangneung route.
fn default_catalog() -> Vec<ChargingStation> {
    let mut yeoju = station(
        "st-yeoju",
        "Yeoju Rest Area",
        "E-pit",
        108.0,
        ChargerType::Superfast,
        350.0,
        347.0,
        (3, 4),
    );
    yeoju.is_recommended = true;
    vec![
        station(
            "st-icheon",
            "Icheon Rest Area",
            "ChargeV",
            62.0,
            ChargerType::Fast,
            100.0,
            292.0,
            (1, 2),
        ),
        yeoju,
        station(
            "st-munmak",
            "Munmak Rest Area",
            "Water",
            142.0,
            ChargerType::Superfast,
            200.0,
            324.0,
            (2, 6),
        ),
        station(
            "st-pyeongchang",
            "Pyeongchang Rest Area",
            "ChargeV",
            213.0,
            ChargerType::Fast,
            100.0,
            309.0,
            (0, 2),
        ),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tick_interval_ms"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Both terminals in use on the default route with one stop.
    pub fn demo() -> Self {
        Self::default()
    }

    /// Only the AC outlet runs; the planner sees DC off.
    pub fn ac_only() -> Self {
        Self {
            toggles: vec![ToggleConfig {
                tick: 0,
                channel: Channel::Ac,
            }],
            journey: JourneyConfig {
                b2h: B2hConfig {
                    dc_on: false,
                    ..B2hConfig::default()
                },
                ..JourneyConfig::default()
            },
            ..Self::default()
        }
    }

    /// Lower starting charge, two stops and a longer session.
    pub fn long_trip() -> Self {
        Self {
            simulation: SimulationConfig {
                ticks: 300,
                seed: 7,
                ..SimulationConfig::default()
            },
            battery: BatteryConfig {
                initial_soc: 60.0,
                ..BatteryConfig::default()
            },
            toggles: vec![
                ToggleConfig {
                    tick: 0,
                    channel: Channel::Dc,
                },
                ToggleConfig {
                    tick: 10,
                    channel: Channel::Ac,
                },
                ToggleConfig {
                    tick: 200,
                    channel: Channel::Dc,
                },
            ],
            journey: JourneyConfig {
                origin_soc: 60.0,
                selected: vec!["st-icheon".to_string(), "st-munmak".to_string()],
                ..JourneyConfig::default()
            },
            ..Self::default()
        }
    }

    /// Upper bound on `simulation.ticks` (about 23 days at 2 s per tick).
    pub const MAX_TICKS: u64 = 1_000_000;

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "ac_only", "long_trip"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "ac_only" => Ok(Self::ac_only()),
            "long_trip" => Ok(Self::long_trip()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(s.tick_interval_ms > 0, "simulation.tick_interval_ms", "must be > 0");
        check(s.history_max > 0, "simulation.history_max", "must be > 0");
        check(s.ticks <= Self::MAX_TICKS, "simulation.ticks", "must be <= 1000000");
        check(s.ramp_up_secs >= 0.0, "simulation.ramp_up_secs", "must be >= 0");
        check(s.ramp_down_secs >= 0.0, "simulation.ramp_down_secs", "must be >= 0");
        check(
            DateTime::parse_from_rfc3339(&s.start_time).is_ok(),
            "simulation.start_time",
            "must be an RFC 3339 timestamp",
        );
        check(
            s.utc_offset_minutes.abs() < 24 * 60,
            "simulation.utc_offset_minutes",
            "must be within one day",
        );
        check(
            s.usage_limit_percent.is_none_or(|p| p.is_finite() && p >= 0.0),
            "simulation.usage_limit_percent",
            "must be >= 0",
        );

        let b = &self.battery;
        check(b.total_capacity_kwh > 0.0, "battery.total_capacity_kwh", "must be > 0");
        check(
            (0.0..100.0).contains(&b.reserve_percent),
            "battery.reserve_percent",
            "must be in [0, 100)",
        );
        check(
            (0.0..=100.0).contains(&b.initial_soc),
            "battery.initial_soc",
            "must be in [0, 100]",
        );
        check(b.km_per_soc >= 0.0, "battery.km_per_soc", "must be >= 0");

        let ac = &self.ac;
        check(ac.min_kw >= 0.0, "ac.min_kw", "must be >= 0");
        check(
            ac.min_kw <= ac.base_kw && ac.base_kw <= ac.max_kw,
            "ac.base_kw",
            "must be within [ac.min_kw, ac.max_kw]",
        );
        check(ac.max_kw <= ac.max_power_kw, "ac.max_kw", "must be <= ac.max_power_kw");
        check(ac.walk_delta_kw >= 0.0, "ac.walk_delta_kw", "must be >= 0");

        let dc = &self.dc;
        check(
            0.0 <= dc.on_min_kw && dc.on_min_kw <= dc.on_max_kw,
            "dc.on_min_kw",
            "must be within [0, dc.on_max_kw]",
        );
        check(
            0.0 <= dc.off_min_kw && dc.off_min_kw <= dc.off_max_kw,
            "dc.off_min_kw",
            "must be within [0, dc.off_max_kw]",
        );
        check(
            0.0 < dc.on_secs_min && dc.on_secs_min <= dc.on_secs_max,
            "dc.on_secs_min",
            "must be within (0, dc.on_secs_max]",
        );
        check(
            0.0 < dc.off_secs_min && dc.off_secs_min <= dc.off_secs_max,
            "dc.off_secs_min",
            "must be within (0, dc.off_secs_max]",
        );
        check(
            dc.on_max_kw <= dc.max_power_kw && dc.inrush_kw <= dc.max_power_kw,
            "dc.max_power_kw",
            "must cover dc.on_max_kw and dc.inrush_kw",
        );

        for (i, t) in self.toggles.iter().enumerate() {
            check(
                t.tick < s.ticks,
                &format!("toggles[{i}].tick"),
                "must be < simulation.ticks",
            );
        }

        let j = &self.journey;
        check(j.total_distance_km > 0.0, "journey.total_distance_km", "must be > 0");
        check(
            (0.0..=100.0).contains(&j.origin_soc),
            "journey.origin_soc",
            "must be in [0, 100]",
        );
        check(
            (0.0..=100.0).contains(&j.default_target_soc),
            "journey.default_target_soc",
            "must be in [0, 100]",
        );
        check(j.energy_per_km > 0.0, "journey.energy_per_km", "must be > 0");
        check(j.minutes_per_km > 0.0, "journey.minutes_per_km", "must be > 0");
        check(j.soc_margin >= 0.0, "journey.soc_margin", "must be >= 0");
        for (i, st) in j.stations.iter().enumerate() {
            check(
                j.stations[..i].iter().all(|other| other.id != st.id),
                &format!("journey.stations[{i}].id"),
                "must be unique",
            );
            check(
                st.max_power_kw > 0.0,
                &format!("journey.stations[{i}].max_power_kw"),
                "must be > 0",
            );
        }
        for id in &j.selected {
            check(
                j.stations.iter().any(|st| &st.id == id),
                "journey.selected",
                &format!("unknown station \"{id}\""),
            );
        }

        errors
    }

    pub fn ramp_timing(&self) -> RampTiming {
        RampTiming {
            up_secs: self.simulation.ramp_up_secs,
            down_secs: self.simulation.ramp_down_secs,
        }
    }

    pub fn battery_spec(&self) -> BatterySpec {
        BatterySpec {
            total_capacity_kwh: self.battery.total_capacity_kwh,
            reserve_percent: self.battery.reserve_percent,
            initial_soc: self.battery.initial_soc,
            km_per_soc: self.battery.km_per_soc,
        }
    }

    pub fn ac_profile(&self) -> AcProfile {
        AcProfile {
            base_kw: self.ac.base_kw,
            min_kw: self.ac.min_kw,
            max_kw: self.ac.max_kw,
            walk_delta_kw: self.ac.walk_delta_kw,
        }
    }

    pub fn dc_profile(&self) -> DcProfile {
        let dc = &self.dc;
        DcProfile {
            on_min_kw: dc.on_min_kw,
            on_max_kw: dc.on_max_kw,
            on_walk_delta_kw: dc.on_walk_delta_kw,
            off_min_kw: dc.off_min_kw,
            off_max_kw: dc.off_max_kw,
            off_walk_delta_kw: dc.off_walk_delta_kw,
            on_secs_min: dc.on_secs_min,
            on_secs_max: dc.on_secs_max,
            off_secs_min: dc.off_secs_min,
            off_secs_max: dc.off_secs_max,
            inrush_kw: dc.inrush_kw,
        }
    }

    /// Session start as a UTC instant.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `simulation.start_time` is not RFC 3339.
    pub fn start_time(&self) -> Result<DateTime<Utc>, ConfigError> {
        DateTime::parse_from_rfc3339(&self.simulation.start_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ConfigError::new("simulation.start_time", e.to_string()))
    }

    /// Builds a simulator with both terminals off.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, if any.
    pub fn build_simulator(&self) -> Result<PowerSimulator, ConfigError> {
        if let Some(err) = self.validate().into_iter().next() {
            return Err(err);
        }
        let s = &self.simulation;
        let ramp = self.ramp_timing();
        let config = SimConfig::new(s.tick_interval_ms, ramp, s.history_max, s.seed);

        Ok(PowerSimulator::new(
            config,
            self.battery_spec(),
            TerminalSpec {
                voltage_v: self.ac.voltage,
                frequency_hz: Some(self.ac.frequency),
                max_power_kw: self.ac.max_power_kw,
            },
            AcChannel::new(self.ac_profile(), ramp, s.seed),
            TerminalSpec {
                voltage_v: self.dc.voltage,
                frequency_hz: None,
                max_power_kw: self.dc.max_power_kw,
            },
            DcChannel::new(self.dc_profile(), ramp, s.seed.wrapping_add(1)),
            SimClock::new(self.start_time()?, s.tick_interval_ms, s.utc_offset_minutes),
        ))
    }

    pub fn planner_params(&self) -> PlannerParams {
        let j = &self.journey;
        PlannerParams {
            total_capacity_kwh: self.battery.total_capacity_kwh,
            energy_per_km: j.energy_per_km,
            minutes_per_km: j.minutes_per_km,
            default_target_soc: j.default_target_soc,
            soc_margin: j.soc_margin,
            b2h_range_km_per_kwh: j.b2h_range_km_per_kwh,
            default_b2h: j.b2h.to_state(),
        }
    }

    pub fn base_plan(&self) -> BasePlan {
        let j = &self.journey;
        BasePlan {
            origin: Endpoint {
                id: "origin".to_string(),
                name: j.origin_name.clone(),
                address: None,
            },
            destination: Endpoint {
                id: "destination".to_string(),
                name: j.destination_name.clone(),
                address: None,
            },
            total_distance_km: j.total_distance_km,
            departure_time: j.departure_time,
            origin_soc: j.origin_soc,
        }
    }

    /// Route summary with the range available at the journey's origin SOC.
    pub fn route_info(&self) -> RouteInfo {
        let j = &self.journey;
        let location = |name: &str| RouteLocation {
            name: name.to_string(),
            address: String::new(),
            lat: 0.0,
            lng: 0.0,
        };
        RouteInfo {
            origin: location(&j.origin_name),
            destination: location(&j.destination_name),
            total_distance_km: j.total_distance_km,
            estimated_duration_min: (j.total_distance_km * j.minutes_per_km).round() as u32,
            current_range_km: (j.origin_soc * self.battery.km_per_soc).max(0.0),
        }
    }

    /// Builds the planner with the configured selection and B2H draw.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, if any.
    pub fn build_planner(&self) -> Result<JourneyPlanner, ConfigError> {
        if let Some(err) = self.validate().into_iter().next() {
            return Err(err);
        }
        JourneyPlanner::new(
            self.base_plan(),
            self.planner_params(),
            self.journey.stations.clone(),
            &self.journey.selected,
            self.journey.b2h.to_state(),
        )
        .map_err(|e| ConfigError::new("journey.selected", e.to_string()))
    }
}
