//! Scripted scenario runner: toggles, ticks, then a planner synced to the terminals.

use tracing::{info, warn};

use crate::config::{ConfigError, ScenarioConfig};
use crate::journey::{JourneyPlanner, RouteInfo};
use crate::sim::summary::SessionSummary;
use crate::sim::{PowerSimulator, TickReport};
use crate::sync;

/// State left behind by a scripted run.
pub struct Session {
    pub simulator: PowerSimulator,
    pub planner: JourneyPlanner,
    pub reports: Vec<TickReport>,
    pub summary: SessionSummary,
    pub route: RouteInfo,
}

/// Runs the configured toggles and ticks, then plans the journey with the
/// terminals' final on/off state and live power.
///
/// # Errors
///
/// Returns the first configuration error found.
pub fn run_session(config: &ScenarioConfig, print_ticks: bool) -> Result<Session, ConfigError> {
    let mut simulator = config.build_simulator()?;
    let mut planner = config.build_planner()?;

    let mut toggles = config.toggles.clone();
    toggles.sort_by_key(|t| t.tick);
    let mut pending = toggles.iter().peekable();

    let ticks = config.simulation.ticks;
    let mut reports = Vec::with_capacity(ticks.min(ScenarioConfig::MAX_TICKS) as usize);
    let mut limit_logged = false;
    if let Some(percent) = config.simulation.usage_limit_percent {
        simulator.set_usage_limit(percent);
    }
    for t in 0..ticks {
        while let Some(toggle) = pending.next_if(|toggle| toggle.tick == t) {
            simulator.toggle(toggle.channel);
        }
        let report = simulator.tick();
        if print_ticks {
            println!("{report}");
        }
        reports.push(report);

        if !limit_logged && simulator.usage_limit_reached() {
            warn!(tick = t, "usage limit reached");
            limit_logged = true;
        }
    }

    let b2h = sync::b2h_from_terminals(
        simulator.ac_terminal(),
        simulator.dc_terminal(),
        &planner.b2h_state(),
    );
    planner.update_b2h_state(b2h);

    let summary = SessionSummary::from_reports(
        &reports,
        simulator.config().tick_sec,
        config.battery.initial_soc,
    );
    let route = config.route_info();
    info!(
        ticks,
        final_soc = summary.final_soc,
        needs_charging = route.needs_charging(route.current_range_km),
        "session finished"
    );

    Ok(Session {
        simulator,
        planner,
        reports,
        summary,
        route,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_scenario_and_seed_is_deterministic() {
        let cfg = ScenarioConfig::demo();
        let a = run_session(&cfg, false).unwrap();
        let b = run_session(&cfg, false).unwrap();
        let powers = |s: &Session| -> Vec<(f64, f64)> {
            s.reports.iter().map(|r| (r.ac_kw, r.dc_kw)).collect()
        };
        assert_eq!(powers(&a), powers(&b));
    }

    #[test]
    fn demo_session_syncs_final_flags() {
        let s = run_session(&ScenarioConfig::demo(), false).unwrap();
        assert_eq!(s.reports.len(), 90);
        // AC toggled on at 0 and off at 60, DC on from tick 5
        assert!(!s.simulator.ac_terminal().is_on);
        assert!(s.simulator.dc_terminal().is_on);
        let b2h = s.planner.b2h_state();
        assert!(!b2h.ac_on);
        assert!(b2h.dc_on);
        assert_eq!(b2h.dc_power_kw, s.simulator.dc_terminal().current_power_kw);
        assert!(s.summary.final_soc < 72.0);
    }

    #[test]
    fn configured_usage_limit_is_applied() {
        let mut cfg = ScenarioConfig::demo();
        cfg.simulation.ticks = 300;
        cfg.simulation.usage_limit_percent = Some(0.1);
        let s = run_session(&cfg, false).unwrap();
        assert_eq!(s.simulator.usage_limit().map(|l| l.kwh), Some(0.1));
        assert!(s.simulator.usage_limit_reached());
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut cfg = ScenarioConfig::demo();
        cfg.battery.total_capacity_kwh = 0.0;
        assert!(run_session(&cfg, false).is_err());
    }
}
