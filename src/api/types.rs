//! API request and response bodies.

use serde::{Deserialize, Serialize};

use crate::journey::B2hState;
use crate::sim::Channel;

/// Error body returned with every non-2xx status.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result of `POST /simulator/toggle/{channel}`.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub channel: Channel,
    pub is_on: bool,
    /// Planner B2H state after mirroring the terminal flags.
    pub b2h: B2hState,
}

/// Result of `POST /simulator/stop`.
#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// Terminals that were on and are now ramping down.
    pub stopped: Vec<Channel>,
    pub b2h: B2hState,
}

/// Body of `PUT /journey/stations`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectStationsRequest {
    /// Station ids from the catalog, any order.
    pub stations: Vec<String>,
}

/// Body of `PUT /journey/target-soc`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSocRequest {
    pub waypoint_id: String,
    pub soc: f64,
}

/// Body of `PUT /journey/b2h`. Omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct B2hUpdateRequest {
    pub ac_on: Option<bool>,
    pub dc_on: Option<bool>,
    pub ac_power_kw: Option<f64>,
    pub dc_power_kw: Option<f64>,
}

impl B2hUpdateRequest {
    pub fn apply(&self, current: B2hState) -> B2hState {
        B2hState {
            ac_on: self.ac_on.unwrap_or(current.ac_on),
            dc_on: self.dc_on.unwrap_or(current.dc_on),
            ac_power_kw: self.ac_power_kw.unwrap_or(current.ac_power_kw).max(0.0),
            dc_power_kw: self.dc_power_kw.unwrap_or(current.dc_power_kw).max(0.0),
        }
    }
}

/// Body of `PUT /simulator/usage-limit`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsageLimitRequest {
    pub percent: f64,
}
