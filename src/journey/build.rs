//! Base itinerary construction from the selected charging stations.

use std::collections::HashSet;

use tracing::warn;

use super::charging::calc_charging_duration;
use super::types::{
    B2hState, BasePlan, ChargeStop, ChargingLeg, ChargingStation, DrivingLeg, JourneySegment,
    JourneyWaypoint, PlannerParams, SegmentKind, StationInfo, WaypointKind,
};
use crate::format::round_to;

/// Waypoints and segments before B2H adjustment and SOC resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseItinerary {
    pub waypoints: Vec<JourneyWaypoint>,
    pub segments: Vec<JourneySegment>,
    pub total_distance_km: f64,
    /// Stations actually placed on the route, in driving order.
    pub stations: Vec<ChargingStation>,
}

/// Id of the `n`-th (1-based) charging waypoint.
pub fn charging_waypoint_id(n: usize) -> String {
    format!("wp-charge-{n}")
}

/// Orders a selection by distance from origin and drops unusable entries.
///
/// Stations with a negative distance or at/after the destination are
/// dropped, and repeated ids keep only their first occurrence. Stations at
/// the same distance keep their relative order.
pub fn normalize_selection(
    stations: &[ChargingStation],
    total_distance_km: f64,
) -> Vec<ChargingStation> {
    let mut seen = HashSet::new();
    let mut kept: Vec<ChargingStation> = Vec::with_capacity(stations.len());

    for station in stations {
        let d = station.distance_from_origin_km;
        if !d.is_finite() || d < 0.0 || d >= total_distance_km {
            warn!(
                station = %station.id,
                distance_km = d,
                total_distance_km,
                "dropping station outside the route"
            );
            continue;
        }
        if !seen.insert(station.id.as_str()) {
            warn!(station = %station.id, "dropping duplicate station");
            continue;
        }
        kept.push(station.clone());
    }

    kept.sort_by(|a, b| a.distance_from_origin_km.total_cmp(&b.distance_from_origin_km));
    kept
}

/// B2H energy (total, AC, DC) drawn over `duration_min` minutes of driving,
/// each rounded to 1 decimal.
pub fn b2h_draw(duration_min: u32, b2h: &B2hState) -> (f64, f64, f64) {
    let hours = f64::from(duration_min) / 60.0;
    (
        round_to(hours * b2h.combined_power_kw(), 1),
        round_to(hours * b2h.ac_draw_kw(), 1),
        round_to(hours * b2h.dc_draw_kw(), 1),
    )
}

/// Duration (minutes) and energy accounting for a driving leg of `distance_km`.
pub fn driving_leg(distance_km: f64, b2h: &B2hState, params: &PlannerParams) -> (u32, DrivingLeg) {
    let distance_km = round_to(distance_km.max(0.0), 1);
    let duration = (distance_km * params.minutes_per_km).round() as u32;
    let (b2h_total, b2h_ac, b2h_dc) = b2h_draw(duration, b2h);
    let leg = DrivingLeg {
        distance_km,
        energy_consumed_kwh: round_to(distance_km * params.energy_per_km, 1),
        b2h_consumed_kwh: b2h_total,
        b2h_ac_consumed_kwh: b2h_ac,
        b2h_dc_consumed_kwh: b2h_dc,
    };
    (duration, leg)
}

/// SOC points consumed by a driving leg on a pack of `capacity_kwh`.
pub fn leg_consumption_percent(leg: &DrivingLeg, capacity_kwh: f64) -> f64 {
    if capacity_kwh <= 0.0 {
        return 0.0;
    }
    leg.total_consumption_kwh() / capacity_kwh * 100.0
}

fn soc_after(soc: f64, leg: &DrivingLeg, capacity_kwh: f64) -> f64 {
    round_to(soc - leg_consumption_percent(leg, capacity_kwh), 1).max(0.0)
}

/// Builds the drive/charge/.../drive itinerary using the default B2H draw
/// and the default departure SOC at every stop.
///
/// # Arguments
///
/// * `base` - Fixed origin, destination and distance of the trip
/// * `selected` - Stations chosen by the user, in any order
/// * `params` - Consumption and vehicle constants
pub fn build_base_itinerary(
    base: &BasePlan,
    selected: &[ChargingStation],
    params: &PlannerParams,
) -> BaseItinerary {
    let stations = normalize_selection(selected, base.total_distance_km);
    let capacity = params.total_capacity_kwh;
    let b2h = params.default_b2h;

    let mut waypoints = vec![JourneyWaypoint {
        id: base.origin.id.clone(),
        name: base.origin.name.clone(),
        address: base.origin.address.clone(),
        arrival_time: base.departure_time,
        arrival_soc: base.origin_soc,
        kind: WaypointKind::Origin,
    }];
    let mut segments = Vec::with_capacity(stations.len() * 2 + 1);

    let mut current_km = 0.0;
    let mut current_soc = base.origin_soc;
    let mut clock = base.departure_time;
    let mut prev_id = base.origin.id.clone();
    let mut prev_name = base.origin.name.clone();

    for (i, station) in stations.iter().enumerate() {
        let id = charging_waypoint_id(i + 1);

        let (drive_min, leg) =
            driving_leg(station.distance_from_origin_km - current_km, &b2h, params);
        let arrival_soc = soc_after(current_soc, &leg, capacity);
        let arrival_time = clock.add_minutes(i64::from(drive_min));
        segments.push(JourneySegment {
            from_id: prev_id.clone(),
            to_id: id.clone(),
            label: format!("{prev_name} to {}", station.name),
            duration_min: drive_min,
            soc_start: current_soc,
            soc_end: arrival_soc,
            start_time: clock,
            end_time: arrival_time,
            kind: SegmentKind::Driving(leg),
        });

        let target = params.default_target_soc;
        let charge_min =
            calc_charging_duration(arrival_soc, target, station.max_power_kw, capacity);
        let departure_time = arrival_time.add_minutes(i64::from(charge_min));
        segments.push(JourneySegment {
            from_id: id.clone(),
            to_id: id.clone(),
            label: station.name.clone(),
            duration_min: charge_min,
            soc_start: arrival_soc,
            soc_end: target,
            start_time: arrival_time,
            end_time: departure_time,
            kind: SegmentKind::Charging(ChargingLeg {
                charge_amount_kwh: round_to(
                    ((target - arrival_soc) / 100.0 * capacity).max(0.0),
                    1,
                ),
            }),
        });

        waypoints.push(JourneyWaypoint {
            id: id.clone(),
            name: station.name.clone(),
            address: Some(station.address.clone()).filter(|a| !a.is_empty()),
            arrival_time,
            arrival_soc,
            kind: WaypointKind::Charging(ChargeStop {
                departure_time,
                departure_soc: target,
                station: StationInfo::from(station),
            }),
        });

        current_km = station.distance_from_origin_km;
        current_soc = target;
        clock = departure_time;
        prev_id = id;
        prev_name = station.name.clone();
    }

    let (drive_min, leg) = driving_leg(base.total_distance_km - current_km, &b2h, params);
    let arrival_soc = soc_after(current_soc, &leg, capacity);
    let arrival_time = clock.add_minutes(i64::from(drive_min));
    segments.push(JourneySegment {
        from_id: prev_id,
        to_id: base.destination.id.clone(),
        label: format!("{prev_name} to {}", base.destination.name),
        duration_min: drive_min,
        soc_start: current_soc,
        soc_end: arrival_soc,
        start_time: clock,
        end_time: arrival_time,
        kind: SegmentKind::Driving(leg),
    });
    waypoints.push(JourneyWaypoint {
        id: base.destination.id.clone(),
        name: base.destination.name.clone(),
        address: base.destination.address.clone(),
        arrival_time,
        arrival_soc,
        kind: WaypointKind::Destination,
    });

    BaseItinerary {
        waypoints,
        segments,
        total_distance_km: base.total_distance_km,
        stations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::types::{ChargerType, Endpoint};

    fn base() -> BasePlan {
        BasePlan {
            origin: Endpoint {
                id: "origin".into(),
                name: "Seoul".into(),
                address: None,
            },
            destination: Endpoint {
                id: "destination".into(),
                name: "Gangneung".into(),
                address: None,
            },
            total_distance_km: 271.0,
            departure_time: "14:30".parse().unwrap(),
            origin_soc: 72.0,
        }
    }

    fn station(id: &str, km: f64) -> ChargingStation {
        ChargingStation {
            id: id.into(),
            name: format!("Station {id}"),
            operator: "op".into(),
            address: String::new(),
            distance_from_origin_km: km,
            detour_distance_km: 0.0,
            charger_type: ChargerType::Superfast,
            max_power_kw: 350.0,
            available_chargers: 2,
            total_chargers: 4,
            waiting_count: 0,
            price_per_kwh: 347.0,
            estimated_arrival_soc: None,
            estimated_charging_time_min: None,
            is_reachable: true,
            is_recommended: false,
        }
    }

    #[test]
    fn driving_leg_rounds_each_quantity() {
        let (min, leg) = driving_leg(108.0, &B2hState::default(), &PlannerParams::default());
        assert_eq!(min, 68);
        assert_eq!(leg.energy_consumed_kwh, 28.4);
        assert_eq!(leg.b2h_consumed_kwh, 7.0);
        assert_eq!(leg.b2h_ac_consumed_kwh, 2.7);
        assert_eq!(leg.b2h_dc_consumed_kwh, 4.3);
    }

    #[test]
    fn single_stop_layout() {
        let it = build_base_itinerary(&base(), &[station("a", 108.0)], &PlannerParams::default());
        let kinds: Vec<&str> = it.segments.iter().map(|s| s.type_name()).collect();
        assert_eq!(kinds, vec!["driving", "charging", "driving"]);
        assert_eq!(it.waypoints.len(), 3);
        assert_eq!(it.waypoints[1].id, "wp-charge-1");
        assert_eq!(it.segments[0].soc_end, 27.8);
        assert_eq!(it.segments[1].soc_end, 80.0);
        assert_eq!(it.segments[2].to_id, "destination");
        assert_eq!(it.segments[2].driving().map(|l| l.distance_km), Some(163.0));
    }

    #[test]
    fn selection_is_sorted_and_deduped() {
        let picked = [station("b", 200.0), station("a", 108.0), station("a", 108.0)];
        let kept = normalize_selection(&picked, 271.0);
        let ids: Vec<&str> = kept.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn stations_beyond_destination_are_dropped() {
        let picked = [station("far", 300.0), station("end", 271.0), station("neg", -1.0)];
        assert!(normalize_selection(&picked, 271.0).is_empty());
    }

    #[test]
    fn same_distance_yields_zero_length_leg() {
        let picked = [station("a", 100.0), station("b", 100.0)];
        let it = build_base_itinerary(&base(), &picked, &PlannerParams::default());
        let second_drive = &it.segments[2];
        assert_eq!(second_drive.driving().map(|l| l.distance_km), Some(0.0));
        assert_eq!(second_drive.duration_min, 0);
        assert_eq!(it.waypoints[2].id, "wp-charge-2");
    }

    #[test]
    fn no_stations_is_one_leg() {
        let it = build_base_itinerary(&base(), &[], &PlannerParams::default());
        assert_eq!(it.segments.len(), 1);
        assert_eq!(it.segments[0].driving().map(|l| l.distance_km), Some(271.0));
        assert_eq!(it.segments[0].soc_end, 0.0);
    }
}
