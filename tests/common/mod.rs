//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use b2h_sim::config::ScenarioConfig;
use b2h_sim::journey::{BasePlan, ChargingStation, JourneyPlanner, PlannerParams};
use b2h_sim::sim::PowerSimulator;

/// Demo scenario with the given master seed.
pub fn demo_config(seed: u64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::demo();
    cfg.simulation.seed = seed;
    cfg
}

/// Idle simulator built from the demo scenario (2 s ticks, 2 s ramps, 60-sample history).
pub fn demo_simulator(seed: u64) -> PowerSimulator {
    demo_config(seed)
        .build_simulator()
        .expect("demo simulator should build")
}

/// Seoul to Gangneung, 271 km, departing 14:30 at 72% SOC.
pub fn demo_base_plan() -> BasePlan {
    ScenarioConfig::demo().base_plan()
}

/// Default vehicle constants (80 kWh pack, both B2H outlets on).
pub fn demo_params() -> PlannerParams {
    ScenarioConfig::demo().planner_params()
}

/// The four stations of the default catalog, ordered by distance.
pub fn demo_catalog() -> Vec<ChargingStation> {
    ScenarioConfig::demo().journey.stations
}

/// Planner over the default catalog with the given station ids selected.
pub fn planner_with(ids: &[&str]) -> JourneyPlanner {
    let cfg = ScenarioConfig::demo();
    JourneyPlanner::new(
        cfg.base_plan(),
        cfg.planner_params(),
        cfg.journey.stations.clone(),
        ids,
        cfg.journey.b2h.to_state(),
    )
    .expect("catalog ids should resolve")
}

/// All subsets of the default catalog's station ids.
pub fn catalog_subsets() -> Vec<Vec<String>> {
    let ids: Vec<String> = demo_catalog().into_iter().map(|s| s.id).collect();
    (0..1u32 << ids.len())
        .map(|mask| {
            ids.iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, id)| id.clone())
                .collect()
        })
        .collect()
}
