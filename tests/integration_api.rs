//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::util::ServiceExt;

use b2h_sim::api::{AppState, router};
use b2h_sim::session::run_session;
use b2h_sim::sim::actor::SimHandle;

/// Run the demo session and hand its simulator and planner to the API.
fn build_api_state() -> Arc<AppState> {
    let session = run_session(&common::demo_config(42), false).expect("demo session should run");
    let sim = SimHandle::spawn_manual(session.simulator);
    Arc::new(AppState::new(sim, session.planner))
}

async fn request(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let req = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let resp = router(Arc::clone(state)).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn simulator_reflects_scripted_session() {
    let state = build_api_state();
    let (status, json) = request(&state, "GET", "/simulator", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ticks"], 90);
    assert_eq!(json["ac"]["is_on"], false);
    assert_eq!(json["dc"]["is_on"], true);
    assert_eq!(json["ac_history"].as_array().map(Vec::len), Some(60));
    assert_eq!(json["active_channel_count"], 1);
}

#[tokio::test]
async fn journey_starts_synced_with_terminals() {
    let state = build_api_state();
    let (status, json) = request(&state, "GET", "/journey", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["b2h"]["ac_on"], false);
    assert_eq!(json["b2h"]["dc_on"], true);

    let segments = json["journey"]["segments"].as_array().expect("segments array");
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[1]["type"], "charging");
    assert_eq!(segments[0]["start_time"], "14:30");
}

#[tokio::test]
async fn b2h_update_drives_simulator_and_toggle_drives_planner() {
    let state = build_api_state();

    let (status, json) = request(&state, "PUT", "/journey/b2h", Some(r#"{"ac_on":true}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["b2h"]["ac_on"], true);
    let snapshot = state.sim.snapshot().await.unwrap();
    assert!(snapshot.ac.is_on);

    state.sim.tick().await.unwrap();
    let (status, json) = request(&state, "POST", "/simulator/toggle/ac", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_on"], false);
    assert_eq!(json["b2h"]["ac_on"], false);
    assert!(!state.planner.lock().await.b2h_state().ac_on);
}

#[tokio::test]
async fn target_soc_override_is_raised_to_minimum() {
    let state = build_api_state();
    let (status, json) = request(
        &state,
        "PUT",
        "/journey/target-soc",
        Some(r#"{"waypoint_id":"wp-charge-1","soc":20}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stop = &json["charge_stops"]["wp-charge-1"];
    assert_eq!(stop["effective_target_soc"], stop["min_target_soc"]);
    assert_eq!(json["target_socs"]["wp-charge-1"], 20.0);
}

#[tokio::test]
async fn station_selection_rebuilds_itinerary() {
    let state = build_api_state();
    let (status, json) = request(
        &state,
        "PUT",
        "/journey/stations",
        Some(r#"{"stations":["st-munmak","st-icheon"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let waypoints = json["journey"]["waypoints"].as_array().expect("waypoints array");
    let names: Vec<&str> = waypoints.iter().filter_map(|w| w["id"].as_str()).collect();
    assert_eq!(names, ["origin", "wp-charge-1", "wp-charge-2", "destination"]);
    assert_eq!(json["journey"]["segments"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let state = build_api_state();
    let (status, _) = request(&state, "PUT", "/journey/stations", Some(r#"{"ids":[]}"#)).await;
    assert!(status.is_client_error());

    let (status, _) = request(&state, "PUT", "/journey/target-soc", Some("not json")).await;
    assert!(status.is_client_error());
}
