//! Integration tests for the journey planner pipeline.

mod common;

use b2h_sim::journey::charging::charging_minutes;
use b2h_sim::journey::{B2hState, JourneyCalculation, calc_charging_duration};

fn assert_soc_chain(calc: &JourneyCalculation, label: &str) {
    let plan = &calc.journey;
    let origin = plan.origin().expect("plan has an origin");
    assert_eq!(plan.segments[0].soc_start, origin.arrival_soc, "{label}");
    for pair in plan.segments.windows(2) {
        assert_eq!(
            pair[0].soc_end, pair[1].soc_start,
            "{label}: {} -> {}",
            pair[0].label, pair[1].label
        );
    }
    assert_eq!(
        plan.segments.last().map(|s| s.soc_end),
        Some(plan.final_arrival_soc),
        "{label}"
    );
}

#[test]
fn soc_chains_across_every_station_selection() {
    for ids in common::catalog_subsets() {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let planner = common::planner_with(&refs);
        let calc = planner.calculation();
        assert_soc_chain(calc, &format!("{ids:?}"));
        assert_eq!(calc.journey.segments.len(), 2 * ids.len() + 1);
        assert_eq!(calc.charge_stops.len(), ids.len());
    }
}

#[test]
fn soc_chain_holds_after_overrides_and_b2h_changes() {
    let mut planner = common::planner_with(&["st-icheon", "st-munmak"]);
    planner
        .update_target_soc("wp-charge-1", 95.0)
        .expect("first stop exists");
    planner.update_b2h_state(B2hState {
        ac_on: false,
        ..B2hState::default()
    });
    assert_soc_chain(planner.calculation(), "override + ac off");
}

#[test]
fn low_override_is_raised_to_minimum_target() {
    for station in common::demo_catalog() {
        let mut planner = common::planner_with(&[station.id.as_str()]);
        planner
            .update_target_soc("wp-charge-1", 10.0)
            .expect("single stop exists");

        let calc = planner.calculation();
        let stop = &calc.charge_stops["wp-charge-1"];
        assert_eq!(stop.effective_target_soc, stop.min_target_soc, "{}", station.id);
        assert!(
            stop.final_arrival_soc >= 5.0 - 0.05,
            "{}: final arrival {}",
            station.id,
            stop.final_arrival_soc
        );
        // the override itself is kept as requested
        assert_eq!(calc.target_socs["wp-charge-1"], 10.0);
    }
}

#[test]
fn single_stop_splits_route_into_three_segments() {
    let planner = common::planner_with(&["st-yeoju"]);
    let plan = planner.journey();

    let kinds: Vec<&str> = plan.segments.iter().map(|s| s.type_name()).collect();
    assert_eq!(kinds, ["driving", "charging", "driving"]);
    assert_eq!(plan.segments[0].driving().map(|l| l.distance_km), Some(108.0));
    assert_eq!(plan.segments[2].driving().map(|l| l.distance_km), Some(163.0));

    let charging = plan.charging_waypoints().next().expect("one charging stop");
    let stop = charging.charge_stop().expect("charging waypoint carries a stop");
    let min = planner.calculation().min_target_socs[&charging.id];
    assert_eq!(stop.departure_soc, 80.0_f64.max(min));
}

#[test]
fn single_stop_totals_add_up() {
    let planner = common::planner_with(&["st-yeoju"]);
    let calc = planner.calculation();
    let g = &calc.globals;

    assert_eq!(g.total_duration_min, g.total_driving_min + g.total_charging_min);
    assert_eq!(g.final_arrival_time, calc.journey.final_arrival_time);
    assert_eq!(
        g.final_arrival_time,
        planner
            .base()
            .departure_time
            .add_minutes(i64::from(g.total_duration_min))
    );
    assert_eq!(
        calc.journey.destination().map(|w| w.arrival_time),
        Some(g.final_arrival_time)
    );
    let cost: i64 = calc.charge_stops.values().map(|s| s.charging_cost).sum();
    assert_eq!(g.total_charging_cost, cost);
    assert!(g.total_charging_cost > 0);
}

#[test]
fn no_stations_collapse_to_one_driving_leg() {
    let mut planner = common::planner_with(&["st-yeoju"]);
    let none: [&str; 0] = [];
    planner.select_stations(&none).expect("empty selection is valid");

    let plan = planner.journey();
    assert_eq!(plan.segments.len(), 1);
    assert_eq!(plan.waypoints.len(), 2);

    let seg = &plan.segments[0];
    assert!(seg.is_driving());
    assert_eq!(seg.driving().map(|l| l.distance_km), Some(271.0));
    assert_eq!(seg.soc_start, 72.0);
    assert!(seg.soc_end <= seg.soc_start);
    assert!(seg.soc_end >= 0.0);
    assert_eq!(plan.total_charging_duration_min, 0);
    assert_eq!(plan.total_charging_cost, 0);
}

#[test]
fn turning_b2h_off_saves_charge() {
    let mut planner = common::planner_with(&["st-munmak"]);
    let with_b2h = planner.calculation().globals;

    planner.update_b2h_state(B2hState {
        ac_on: false,
        dc_on: false,
        ..B2hState::default()
    });
    let without = planner.calculation().globals;

    assert_eq!(without.total_b2h_consumed_kwh, 0.0);
    assert_eq!(without.range_reduction_km, 0.0);
    assert!(with_b2h.total_b2h_consumed_kwh > 0.0);
    assert!(without.total_charging_cost <= with_b2h.total_charging_cost);
    assert_eq!(without.total_driving_min, with_b2h.total_driving_min);
}

#[test]
fn charging_duration_in_lower_band() {
    // 52 points of an 80 kWh pack at 0.8 x 350 kW
    let exact = charging_minutes(28.0, 80.0, 350.0, 80.0);
    let expected = 52.0 / 100.0 * 80.0 / (350.0 * 0.8) * 60.0;
    assert!((exact - expected).abs() < 1e-9);
    assert_eq!(calc_charging_duration(28.0, 80.0, 350.0, 80.0), 9);
}

#[test]
fn charging_above_eighty_percent_is_slower() {
    let lower = charging_minutes(60.0, 70.0, 200.0, 80.0);
    let middle = charging_minutes(80.0, 90.0, 200.0, 80.0);
    let upper = charging_minutes(90.0, 100.0, 200.0, 80.0);
    assert!(lower < middle);
    assert!(middle < upper);
}
