//! B2H simulator entry point: CLI wiring, scripted session, journey report.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use b2h_sim::config::ScenarioConfig;
use b2h_sim::format::{format_currency, minutes_to_time_string};
use b2h_sim::io::export::{export_segments_csv, export_ticks_csv};
use b2h_sim::journey::{
    JourneyCalculation, RouteInfo, WaypointKind, rank_stations, reachable_stations,
};
use b2h_sim::session::run_session;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    ticks_override: Option<u64>,
    telemetry_out: Option<String>,
    journey_out: Option<String>,
    quiet: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("b2h-sim: EV battery-to-home power export simulator and journey planner");
    eprintln!();
    eprintln!("Usage: b2h-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --ticks <n>              Override number of ticks");
    eprintln!("  --telemetry-out <path>   Export tick records to CSV");
    eprintln!("  --journey-out <path>     Export itinerary segments to CSV");
    eprintln!("  --quiet                  Do not print per-tick lines");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the session");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the demo preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn require_value(args: &[String], i: usize, flag: &str, kind: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {kind} argument");
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str, kind: &str) -> T {
    match value.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("error: {flag} value \"{value}\" is not a valid {kind}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        ticks_override: None,
        telemetry_out: None,
        journey_out: None,
        quiet: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(require_value(&args, i, "--scenario", "path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(require_value(&args, i, "--preset", "name"));
            }
            "--seed" => {
                i += 1;
                let v = require_value(&args, i, "--seed", "u64");
                cli.seed_override = Some(parse_number(&v, "--seed", "u64"));
            }
            "--ticks" => {
                i += 1;
                let v = require_value(&args, i, "--ticks", "u64");
                cli.ticks_override = Some(parse_number(&v, "--ticks", "u64"));
            }
            "--telemetry-out" => {
                i += 1;
                cli.telemetry_out = Some(require_value(&args, i, "--telemetry-out", "path"));
            }
            "--journey-out" => {
                i += 1;
                cli.journey_out = Some(require_value(&args, i, "--journey-out", "path"));
            }
            "--quiet" | "-q" => {
                cli.quiet = true;
            }
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let v = require_value(&args, i, "--port", "u16");
                cli.port = parse_number(&v, "--port", "u16");
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_journey(calc: &JourneyCalculation, route: &RouteInfo) {
    let plan = &calc.journey;
    println!("--- Journey Plan ---");
    println!(
        "Route:                 {} to {} ({:.0} km, range {:.1} km{})",
        route.origin.name,
        route.destination.name,
        route.total_distance_km,
        route.current_range_km,
        if route.needs_charging(route.current_range_km) {
            ", charging required"
        } else {
            ""
        }
    );

    for wp in &plan.waypoints {
        match &wp.kind {
            WaypointKind::Origin => println!(
                "  {} depart {}  SoC {:.1}%",
                wp.arrival_time, wp.name, wp.arrival_soc
            ),
            WaypointKind::Charging(stop) => {
                let result = calc.charge_stops.get(&wp.id);
                println!(
                    "  {} arrive {}  SoC {:.1}% -> {:.1}% ({}, {} won, min {:.0}%), depart {}",
                    wp.arrival_time,
                    wp.name,
                    wp.arrival_soc,
                    stop.departure_soc,
                    minutes_to_time_string(result.map_or(0, |r| r.charging_duration_min)),
                    format_currency(result.map_or(0, |r| r.charging_cost)),
                    result.map_or(0.0, |r| r.min_target_soc),
                    stop.departure_time,
                );
            }
            WaypointKind::Destination => println!(
                "  {} arrive {}  SoC {:.1}%",
                wp.arrival_time, wp.name, wp.arrival_soc
            ),
        }
    }

    let g = &calc.globals;
    println!(
        "Total time:            {} (driving {}, charging {})",
        minutes_to_time_string(g.total_duration_min),
        minutes_to_time_string(g.total_driving_min),
        minutes_to_time_string(g.total_charging_min)
    );
    println!("Charging cost:         {} won", format_currency(g.total_charging_cost));
    println!(
        "B2H while driving:     {:.1} kWh (range -{:.0} km)",
        g.total_b2h_consumed_kwh, g.range_reduction_km
    );
    println!(
        "Arrival:               {} at {:.1}% SoC",
        g.final_arrival_time, g.final_arrival_soc
    );
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // Load config: --scenario takes priority, then --preset, then demo default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::demo()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(ticks) = cli.ticks_override {
        scenario.simulation.ticks = ticks;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let session = match run_session(&scenario, !cli.quiet) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    println!("\n{}", session.summary);
    if let Some(limit) = session.simulator.usage_limit() {
        println!(
            "Usage limit:           {:.1}% ({:.1} kWh){}",
            limit.percent,
            limit.kwh,
            if session.simulator.usage_limit_reached() {
                ", reached"
            } else {
                ""
            }
        );
    }
    if let Some(alert) = session.simulator.usage_alert() {
        println!(
            "Runtime left:          {} (reserve reached at {})",
            alert.remaining_time, alert.depletion_time
        );
    }
    println!();
    print_journey(session.planner.calculation(), &session.route);

    let in_range = reachable_stations(session.planner.catalog(), session.route.current_range_km);
    let reachable: Vec<&str> = rank_stations(in_range)
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    println!("Reachable stations:    {}", reachable.join(", "));

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_ticks_csv(&session.reports, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }
    if let Some(ref path) = cli.journey_out {
        if let Err(e) = export_segments_csv(&session.planner.journey().segments, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Journey segments written to {path}");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        let result = rt.block_on(async move {
            let sim = b2h_sim::sim::actor::SimHandle::spawn(session.simulator);
            let state = Arc::new(b2h_sim::api::AppState::new(sim, session.planner));
            b2h_sim::api::serve(state, addr).await
        });
        if let Err(e) = result {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
