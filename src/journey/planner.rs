//! Itinerary recomputation and the stateful planner.
//!
//! A recompute always runs the pipeline to completion, in this order:
//! B2H adjustment, SOC chain with charge-target resolution, global
//! aggregates, layout hints, then clock times. The base itinerary is rebuilt
//! only when the station selection changes.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::build::{BaseItinerary, b2h_draw, build_base_itinerary, leg_consumption_percent};
use super::charging::calc_charging_duration;
use super::layout::{LayoutParams, SegmentLayout, segment_layout};
use super::types::{
    B2hState, BasePlan, ChargingStation, JourneyPlan, JourneySegment, JourneyWaypoint,
    PlannerParams, SegmentKind, WaypointKind,
};
use crate::format::{ClockTime, round_to};

/// Station power assumed when a catalog entry reports none (kW).
pub const FALLBACK_STATION_POWER_KW: f64 = 200.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("unknown charging waypoint \"{0}\"")]
    UnknownWaypoint(String),
    #[error("unknown charging station \"{0}\"")]
    UnknownStation(String),
}

/// Per-stop outcome of a recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeStopResult {
    pub charging_duration_min: u32,
    /// Whole currency units.
    pub charging_cost: i64,
    pub charge_kwh: f64,
    pub min_target_soc: f64,
    /// Departure SOC actually used, after raising to the minimum.
    pub effective_target_soc: f64,
    /// SOC on arrival at the next waypoint.
    pub final_arrival_soc: f64,
    pub charging_segment: JourneySegment,
    pub next_driving_segment: Option<JourneySegment>,
}

/// Totals over the whole itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JourneyGlobals {
    pub total_driving_min: u32,
    pub total_charging_min: u32,
    pub total_duration_min: u32,
    pub final_arrival_soc: f64,
    pub final_arrival_time: ClockTime,
    pub total_charging_cost: i64,
    /// B2H energy over the driving time at the current draw (kWh).
    pub total_b2h_consumed_kwh: f64,
    pub range_reduction_km: f64,
}

/// Everything derived by one recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyCalculation {
    pub journey: JourneyPlan,
    pub globals: JourneyGlobals,
    pub charge_stops: BTreeMap<String, ChargeStopResult>,
    pub min_target_socs: BTreeMap<String, f64>,
    /// Requested departure SOC per stop (override or default).
    pub target_socs: BTreeMap<String, f64>,
    pub charging_durations: BTreeMap<String, u32>,
    pub layout: SegmentLayout,
    pub b2h: B2hState,
}

struct StopResolution {
    segment_idx: usize,
    next_drive_idx: Option<usize>,
    requested: f64,
    min_target: f64,
    effective: f64,
    charge_kwh: f64,
    duration_min: u32,
    cost: i64,
    final_arrival_soc: f64,
}

/// Full recompute from scratch: build, then every downstream stage.
pub fn recompute(
    base: &BasePlan,
    selected: &[ChargingStation],
    overrides: &BTreeMap<String, f64>,
    b2h: &B2hState,
    params: &PlannerParams,
) -> JourneyCalculation {
    let itinerary = build_base_itinerary(base, selected, params);
    recompute_from(&itinerary, base, overrides, b2h, params)
}

/// Runs every stage after the base build on a copy of `itinerary`.
pub fn recompute_from(
    itinerary: &BaseItinerary,
    base: &BasePlan,
    overrides: &BTreeMap<String, f64>,
    b2h: &B2hState,
    params: &PlannerParams,
) -> JourneyCalculation {
    let mut waypoints = itinerary.waypoints.clone();
    let mut segments = itinerary.segments.clone();

    apply_b2h(&mut segments, b2h);
    let stops = resolve_soc_chain(&mut waypoints, &mut segments, overrides, params);
    let globals = derive_globals(base, &segments, &stops, b2h, params);
    let layout = segment_layout(&segments, globals.total_duration_min, &LayoutParams::default());
    assign_times(base.departure_time, &mut waypoints, &mut segments);

    let mut charge_stops = BTreeMap::new();
    let mut min_target_socs = BTreeMap::new();
    let mut target_socs = BTreeMap::new();
    let mut charging_durations = BTreeMap::new();
    for (id, stop) in &stops {
        min_target_socs.insert(id.clone(), stop.min_target);
        target_socs.insert(id.clone(), stop.requested);
        charging_durations.insert(id.clone(), stop.duration_min);
        charge_stops.insert(
            id.clone(),
            ChargeStopResult {
                charging_duration_min: stop.duration_min,
                charging_cost: stop.cost,
                charge_kwh: stop.charge_kwh,
                min_target_soc: stop.min_target,
                effective_target_soc: stop.effective,
                final_arrival_soc: stop.final_arrival_soc,
                charging_segment: segments[stop.segment_idx].clone(),
                next_driving_segment: stop.next_drive_idx.map(|i| segments[i].clone()),
            },
        );
    }

    debug!(
        segments = segments.len(),
        total_min = globals.total_duration_min,
        final_soc = globals.final_arrival_soc,
        cost = globals.total_charging_cost,
        "journey recomputed"
    );

    JourneyCalculation {
        journey: JourneyPlan {
            waypoints,
            segments,
            total_distance_km: itinerary.total_distance_km,
            total_duration_min: globals.total_duration_min,
            total_driving_duration_min: globals.total_driving_min,
            total_charging_duration_min: globals.total_charging_min,
            total_b2h_consumed_kwh: globals.total_b2h_consumed_kwh,
            total_charging_cost: globals.total_charging_cost,
            final_arrival_time: globals.final_arrival_time,
            final_arrival_soc: globals.final_arrival_soc,
        },
        globals,
        charge_stops,
        min_target_socs,
        target_socs,
        charging_durations,
        layout,
        b2h: *b2h,
    }
}

/// Recomputes the B2H energy on every driving leg from the current draw.
/// Traction energy is left untouched.
pub fn apply_b2h(segments: &mut [JourneySegment], b2h: &B2hState) {
    for seg in segments.iter_mut() {
        let duration = seg.duration_min;
        if let SegmentKind::Driving(leg) = &mut seg.kind {
            let (total, ac, dc) = b2h_draw(duration, b2h);
            leg.b2h_consumed_kwh = total;
            leg.b2h_ac_consumed_kwh = ac;
            leg.b2h_dc_consumed_kwh = dc;
        }
    }
}

/// Walks the chain carrying the running SOC and resolves each stop's target.
fn resolve_soc_chain(
    waypoints: &mut [JourneyWaypoint],
    segments: &mut [JourneySegment],
    overrides: &BTreeMap<String, f64>,
    params: &PlannerParams,
) -> BTreeMap<String, StopResolution> {
    let capacity = params.total_capacity_kwh;
    let index: HashMap<String, usize> = waypoints
        .iter()
        .enumerate()
        .map(|(i, w)| (w.id.clone(), i))
        .collect();

    let mut stops = BTreeMap::new();
    let mut current_soc = waypoints.first().map_or(0.0, |w| w.arrival_soc);

    for i in 0..segments.len() {
        let next_drive_idx = (i + 1..segments.len())
            .find(|&j| segments[j].is_driving() && segments[j].from_id == segments[i].from_id);
        let next_consumption = next_drive_idx
            .and_then(|j| segments[j].driving())
            .map(|leg| leg_consumption_percent(leg, capacity));

        let seg = &mut segments[i];
        match seg.kind {
            SegmentKind::Driving(leg) => {
                seg.soc_start = current_soc;
                let soc_end = current_soc - leg_consumption_percent(&leg, capacity);
                seg.soc_end = round_to(soc_end, 1).max(0.0);
                current_soc = seg.soc_end;
                if let Some(&w) = index.get(&seg.to_id) {
                    waypoints[w].arrival_soc = current_soc;
                }
            }
            SegmentKind::Charging(ref mut charge) => {
                let Some(&w) = index.get(&seg.from_id) else {
                    continue;
                };
                let waypoint = &mut waypoints[w];
                let arrival = waypoint.arrival_soc;
                let WaypointKind::Charging(stop) = &mut waypoint.kind else {
                    continue;
                };

                let min_target = match next_consumption {
                    Some(pct) => (arrival + params.soc_margin + pct).ceil().min(100.0),
                    None => (arrival + params.soc_margin).min(100.0),
                };
                let requested = overrides
                    .get(&waypoint.id)
                    .copied()
                    .unwrap_or(params.default_target_soc);
                let effective = requested.min(100.0).max(min_target);
                if effective > requested {
                    warn!(
                        waypoint = %waypoint.id,
                        requested,
                        min_target,
                        "target SOC raised to minimum"
                    );
                }

                let power = if stop.station.max_power_kw > 0.0 {
                    stop.station.max_power_kw
                } else {
                    FALLBACK_STATION_POWER_KW
                };
                let charge_kwh = round_to(((effective - arrival) / 100.0 * capacity).max(0.0), 1);
                let duration_min = calc_charging_duration(arrival, effective, power, capacity);
                let cost = (charge_kwh * stop.station.price_per_kwh).round() as i64;

                charge.charge_amount_kwh = charge_kwh;
                seg.duration_min = duration_min;
                seg.soc_start = arrival;
                seg.soc_end = effective;
                stop.departure_soc = effective;
                current_soc = effective;

                let final_arrival_soc = next_consumption
                    .map_or(effective, |pct| round_to(effective - pct, 1).max(0.0));

                stops.insert(
                    waypoint.id.clone(),
                    StopResolution {
                        segment_idx: i,
                        next_drive_idx,
                        requested,
                        min_target,
                        effective,
                        charge_kwh,
                        duration_min,
                        cost,
                        final_arrival_soc,
                    },
                );
            }
        }
    }

    stops
}

fn derive_globals(
    base: &BasePlan,
    segments: &[JourneySegment],
    stops: &BTreeMap<String, StopResolution>,
    b2h: &B2hState,
    params: &PlannerParams,
) -> JourneyGlobals {
    let total_driving_min: u32 = segments
        .iter()
        .filter(|s| s.is_driving())
        .map(|s| s.duration_min)
        .sum();
    let total_charging_min: u32 = segments
        .iter()
        .filter(|s| s.is_charging())
        .map(|s| s.duration_min)
        .sum();
    let total_duration_min = total_driving_min + total_charging_min;
    let total_b2h = round_to(f64::from(total_driving_min) / 60.0 * b2h.combined_power_kw(), 1);

    JourneyGlobals {
        total_driving_min,
        total_charging_min,
        total_duration_min,
        final_arrival_soc: segments.last().map_or(base.origin_soc, |s| s.soc_end),
        final_arrival_time: base.departure_time.add_minutes(i64::from(total_duration_min)),
        total_charging_cost: stops.values().map(|s| s.cost).sum(),
        total_b2h_consumed_kwh: total_b2h,
        range_reduction_km: (total_b2h * params.b2h_range_km_per_kwh).round(),
    }
}

/// Lays the segments out on the clock starting at `departure`.
fn assign_times(
    departure: ClockTime,
    waypoints: &mut [JourneyWaypoint],
    segments: &mut [JourneySegment],
) {
    let index: HashMap<String, usize> = waypoints
        .iter()
        .enumerate()
        .map(|(i, w)| (w.id.clone(), i))
        .collect();

    let mut cursor = departure;
    if let Some(origin) = waypoints.first_mut() {
        origin.arrival_time = departure;
    }
    for seg in segments.iter_mut() {
        seg.start_time = cursor;
        cursor = cursor.add_minutes(i64::from(seg.duration_min));
        seg.end_time = cursor;

        match seg.kind {
            SegmentKind::Driving(_) => {
                if let Some(&w) = index.get(&seg.to_id) {
                    waypoints[w].arrival_time = cursor;
                }
            }
            SegmentKind::Charging(_) => {
                if let Some(&w) = index.get(&seg.from_id)
                    && let WaypointKind::Charging(stop) = &mut waypoints[w].kind
                {
                    stop.departure_time = cursor;
                }
            }
        }
    }
}

/// Resolves station ids against a catalog, preserving the given order.
pub fn select_from_catalog<S: AsRef<str>>(
    catalog: &[ChargingStation],
    ids: &[S],
) -> Result<Vec<ChargingStation>, PlannerError> {
    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            catalog
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| PlannerError::UnknownStation(id.to_string()))
        })
        .collect()
}

/// Holds the planner inputs and the latest calculation.
///
/// Every mutation re-derives the whole calculation before returning, so
/// readers never observe a partially updated itinerary.
#[derive(Debug, Clone)]
pub struct JourneyPlanner {
    base: BasePlan,
    params: PlannerParams,
    catalog: Vec<ChargingStation>,
    itinerary: BaseItinerary,
    overrides: BTreeMap<String, f64>,
    b2h: B2hState,
    calculation: JourneyCalculation,
}

impl JourneyPlanner {
    /// Creates a planner with `selected` station ids resolved against `catalog`.
    pub fn new<S: AsRef<str>>(
        base: BasePlan,
        params: PlannerParams,
        catalog: Vec<ChargingStation>,
        selected: &[S],
        b2h: B2hState,
    ) -> Result<Self, PlannerError> {
        let stations = select_from_catalog(&catalog, selected)?;
        let itinerary = build_base_itinerary(&base, &stations, &params);
        let overrides = default_overrides(&itinerary, &params);
        let calculation = recompute_from(&itinerary, &base, &overrides, &b2h, &params);
        Ok(Self {
            base,
            params,
            catalog,
            itinerary,
            overrides,
            b2h,
            calculation,
        })
    }

    pub fn calculation(&self) -> &JourneyCalculation {
        &self.calculation
    }

    pub fn journey(&self) -> &JourneyPlan {
        &self.calculation.journey
    }

    pub fn b2h_state(&self) -> B2hState {
        self.b2h
    }

    pub fn overrides(&self) -> &BTreeMap<String, f64> {
        &self.overrides
    }

    /// Stations placed on the route, in driving order.
    pub fn selected_stations(&self) -> &[ChargingStation] {
        &self.itinerary.stations
    }

    pub fn catalog(&self) -> &[ChargingStation] {
        &self.catalog
    }

    pub fn base(&self) -> &BasePlan {
        &self.base
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    /// Replaces the station selection.
    ///
    /// A changed selection rebuilds the itinerary and resets every stop's
    /// target SOC to the default. Selecting the same stations again is a no-op.
    pub fn select_stations<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), PlannerError> {
        let stations = select_from_catalog(&self.catalog, ids)?;
        let itinerary = build_base_itinerary(&self.base, &stations, &self.params);
        if station_ids(&itinerary) == station_ids(&self.itinerary) {
            return Ok(());
        }

        self.overrides = default_overrides(&itinerary, &self.params);
        self.itinerary = itinerary;
        info!(stations = ?station_ids(&self.itinerary), "station selection changed");
        self.refresh();
        Ok(())
    }

    /// Sets the requested departure SOC of one charging stop.
    ///
    /// Requests are clamped to `[0, 100]`; the recompute may still raise the
    /// effective target to the stop's minimum.
    pub fn update_target_soc(&mut self, waypoint_id: &str, soc: f64) -> Result<(), PlannerError> {
        let known = self
            .itinerary
            .waypoints
            .iter()
            .any(|w| w.id == waypoint_id && w.is_charging());
        if !known {
            return Err(PlannerError::UnknownWaypoint(waypoint_id.to_string()));
        }

        self.overrides
            .insert(waypoint_id.to_string(), soc.clamp(0.0, 100.0));
        info!(waypoint = waypoint_id, soc, "target SOC updated");
        self.refresh();
        Ok(())
    }

    /// Sets the B2H draw. Returns `false` and does nothing when unchanged.
    pub fn update_b2h_state(&mut self, b2h: B2hState) -> bool {
        if b2h == self.b2h {
            return false;
        }
        self.b2h = b2h;
        info!(
            ac_on = b2h.ac_on,
            dc_on = b2h.dc_on,
            ac_kw = b2h.ac_power_kw,
            dc_kw = b2h.dc_power_kw,
            "B2H state updated"
        );
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        self.calculation = recompute_from(
            &self.itinerary,
            &self.base,
            &self.overrides,
            &self.b2h,
            &self.params,
        );
    }
}

fn station_ids(itinerary: &BaseItinerary) -> Vec<&str> {
    itinerary.stations.iter().map(|s| s.id.as_str()).collect()
}

fn default_overrides(itinerary: &BaseItinerary, params: &PlannerParams) -> BTreeMap<String, f64> {
    itinerary
        .waypoints
        .iter()
        .filter(|w| w.is_charging())
        .map(|w| (w.id.clone(), params.default_target_soc))
        .collect()
}
