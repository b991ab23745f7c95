//! Journey planner: itinerary synthesis, SOC chaining and charge-stop resolution.

pub mod build;
pub mod charging;
pub mod layout;
pub mod planner;
pub mod types;

pub use build::{BaseItinerary, build_base_itinerary, normalize_selection};
pub use charging::calc_charging_duration;
pub use layout::{LayoutParams, SegmentLayout};
pub use planner::{
    ChargeStopResult, JourneyCalculation, JourneyGlobals, JourneyPlanner, PlannerError, recompute,
};
pub use types::{
    B2hState, BasePlan, ChargerType, ChargingStation, Endpoint, JourneyPlan, JourneySegment,
    JourneyWaypoint, PlannerParams, RouteInfo, RouteLocation, SegmentKind, WaypointKind,
    rank_stations, reachable_stations,
};
