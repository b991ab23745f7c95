//! Journey data model: route, station catalog entries, waypoints, segments, plans.

use serde::{Deserialize, Serialize};

use crate::format::ClockTime;

/// A named place on the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLocation {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

/// Static route description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub origin: RouteLocation,
    pub destination: RouteLocation,
    pub total_distance_km: f64,
    /// Driving time without stops (minutes).
    pub estimated_duration_min: u32,
    /// Range on the current charge (km).
    pub current_range_km: f64,
}

impl RouteInfo {
    /// Whether the trip is longer than `range_km`.
    pub fn needs_charging(&self, range_km: f64) -> bool {
        self.total_distance_km > range_km
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerType {
    Fast,
    Superfast,
}

/// Catalog entry for a charging station along the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargingStation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub address: String,
    pub distance_from_origin_km: f64,
    /// Extra distance off the route (km, 0 when on the route).
    #[serde(default)]
    pub detour_distance_km: f64,
    pub charger_type: ChargerType,
    pub max_power_kw: f64,
    #[serde(default)]
    pub available_chargers: u32,
    #[serde(default)]
    pub total_chargers: u32,
    #[serde(default)]
    pub waiting_count: u32,
    /// Price per kWh in whole currency units.
    pub price_per_kwh: f64,
    #[serde(default)]
    pub estimated_arrival_soc: Option<f64>,
    #[serde(default)]
    pub estimated_charging_time_min: Option<u32>,
    #[serde(default = "default_true")]
    pub is_reachable: bool,
    #[serde(default)]
    pub is_recommended: bool,
}

fn default_true() -> bool {
    true
}

/// Stations flagged reachable whose distance from origin is within `range_km`.
pub fn reachable_stations(stations: &[ChargingStation], range_km: f64) -> Vec<&ChargingStation> {
    stations
        .iter()
        .filter(|s| s.is_reachable && s.distance_from_origin_km <= range_km)
        .collect()
}

impl ChargingStation {
    fn display_rank(&self) -> u8 {
        if self.is_recommended {
            2
        } else if self.is_reachable {
            1
        } else {
            0
        }
    }
}

/// Orders stations for display: recommended first, then reachable, then
/// unreachable, nearest first within each group.
pub fn rank_stations<'a>(
    stations: impl IntoIterator<Item = &'a ChargingStation>,
) -> Vec<&'a ChargingStation> {
    let mut ranked: Vec<_> = stations.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.display_rank()
            .cmp(&a.display_rank())
            .then(a.distance_from_origin_km.total_cmp(&b.distance_from_origin_km))
    });
    ranked
}

/// Station details embedded in a charging waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationInfo {
    pub station_id: String,
    pub operator: String,
    pub max_power_kw: f64,
    pub charger_type: ChargerType,
    pub available_chargers: u32,
    pub total_chargers: u32,
    pub price_per_kwh: f64,
}

impl From<&ChargingStation> for StationInfo {
    fn from(s: &ChargingStation) -> Self {
        Self {
            station_id: s.id.clone(),
            operator: s.operator.clone(),
            max_power_kw: s.max_power_kw,
            charger_type: s.charger_type,
            available_chargers: s.available_chargers,
            total_chargers: s.total_chargers,
            price_per_kwh: s.price_per_kwh,
        }
    }
}

/// Charging-stop data of a waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeStop {
    pub departure_time: ClockTime,
    pub departure_soc: f64,
    pub station: StationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WaypointKind {
    Origin,
    Charging(ChargeStop),
    Destination,
}

/// A stop on the journey. `id` joins waypoints with segments and target-SOC overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyWaypoint {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub arrival_time: ClockTime,
    pub arrival_soc: f64,
    #[serde(flatten)]
    pub kind: WaypointKind,
}

impl JourneyWaypoint {
    pub fn charge_stop(&self) -> Option<&ChargeStop> {
        match &self.kind {
            WaypointKind::Charging(stop) => Some(stop),
            _ => None,
        }
    }

    pub fn is_charging(&self) -> bool {
        matches!(self.kind, WaypointKind::Charging(_))
    }
}

/// Energy accounting of a driving leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrivingLeg {
    pub distance_km: f64,
    /// Traction energy only (kWh).
    pub energy_consumed_kwh: f64,
    /// B2H draw over the leg, both terminals (kWh).
    pub b2h_consumed_kwh: f64,
    pub b2h_ac_consumed_kwh: f64,
    pub b2h_dc_consumed_kwh: f64,
}

impl DrivingLeg {
    /// Traction plus B2H energy (kWh).
    pub fn total_consumption_kwh(&self) -> f64 {
        self.energy_consumed_kwh + self.b2h_consumed_kwh
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChargingLeg {
    pub charge_amount_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SegmentKind {
    Driving(DrivingLeg),
    Charging(ChargingLeg),
}

/// Edge between two waypoints. A charging segment starts and ends at the same waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySegment {
    pub from_id: String,
    pub to_id: String,
    pub label: String,
    pub duration_min: u32,
    pub soc_start: f64,
    pub soc_end: f64,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(flatten)]
    pub kind: SegmentKind,
}

impl JourneySegment {
    pub fn driving(&self) -> Option<&DrivingLeg> {
        match &self.kind {
            SegmentKind::Driving(leg) => Some(leg),
            SegmentKind::Charging(_) => None,
        }
    }

    pub fn is_driving(&self) -> bool {
        matches!(self.kind, SegmentKind::Driving(_))
    }

    pub fn is_charging(&self) -> bool {
        matches!(self.kind, SegmentKind::Charging(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SegmentKind::Driving(_) => "driving",
            SegmentKind::Charging(_) => "charging",
        }
    }
}

/// Full itinerary with totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyPlan {
    pub waypoints: Vec<JourneyWaypoint>,
    pub segments: Vec<JourneySegment>,
    pub total_distance_km: f64,
    /// Driving plus charging (minutes).
    pub total_duration_min: u32,
    pub total_driving_duration_min: u32,
    pub total_charging_duration_min: u32,
    pub total_b2h_consumed_kwh: f64,
    /// Whole currency units.
    pub total_charging_cost: i64,
    pub final_arrival_time: ClockTime,
    pub final_arrival_soc: f64,
}

impl JourneyPlan {
    pub fn origin(&self) -> Option<&JourneyWaypoint> {
        self.waypoints
            .iter()
            .find(|w| matches!(w.kind, WaypointKind::Origin))
    }

    pub fn destination(&self) -> Option<&JourneyWaypoint> {
        self.waypoints
            .iter()
            .find(|w| matches!(w.kind, WaypointKind::Destination))
    }

    pub fn charging_waypoints(&self) -> impl Iterator<Item = &JourneyWaypoint> {
        self.waypoints.iter().filter(|w| w.is_charging())
    }
}

/// Live B2H draw assumed while driving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct B2hState {
    pub ac_on: bool,
    pub dc_on: bool,
    pub ac_power_kw: f64,
    pub dc_power_kw: f64,
}

impl Default for B2hState {
    fn default() -> Self {
        Self {
            ac_on: true,
            dc_on: true,
            ac_power_kw: 2.4,
            dc_power_kw: 3.8,
        }
    }
}

impl B2hState {
    /// Combined draw of the terminals that are on (kW).
    pub fn combined_power_kw(&self) -> f64 {
        self.ac_draw_kw() + self.dc_draw_kw()
    }

    pub fn ac_draw_kw(&self) -> f64 {
        if self.ac_on { self.ac_power_kw } else { 0.0 }
    }

    pub fn dc_draw_kw(&self) -> f64 {
        if self.dc_on { self.dc_power_kw } else { 0.0 }
    }
}

/// End of the route as given by the static journey template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Static journey template: the fixed ends of the trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasePlan {
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub total_distance_km: f64,
    pub departure_time: ClockTime,
    /// SOC on departure (%).
    pub origin_soc: f64,
}

/// Vehicle and consumption constants used by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannerParams {
    pub total_capacity_kwh: f64,
    /// Traction energy (kWh/km).
    pub energy_per_km: f64,
    /// Average pace (min/km).
    pub minutes_per_km: f64,
    /// Departure SOC of a stop without an override (%).
    pub default_target_soc: f64,
    /// Minimum SOC (percentage points) on arrival at the next waypoint.
    pub soc_margin: f64,
    /// Range lost per kWh of B2H energy (km/kWh).
    pub b2h_range_km_per_kwh: f64,
    /// B2H draw assumed when the base itinerary is built.
    pub default_b2h: B2hState,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            total_capacity_kwh: 80.0,
            energy_per_km: 0.263,
            minutes_per_km: 0.628,
            default_target_soc: 80.0,
            soc_margin: 5.0,
            b2h_range_km_per_kwh: 2.56,
            default_b2h: B2hState::default(),
        }
    }
}
