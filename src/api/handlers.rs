//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{
    B2hUpdateRequest, ErrorResponse, SelectStationsRequest, StopResponse, TargetSocRequest,
    ToggleResponse, UsageLimitRequest,
};
use crate::journey::{JourneyCalculation, PlannerError};
use crate::sim::actor::SimStopped;
use crate::sim::usage::UsageLimit;
use crate::sim::{Channel, SimulatorSnapshot};
use crate::sync;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn unavailable(e: SimStopped) -> ApiError {
    error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

fn planner_error(e: PlannerError) -> ApiError {
    let status = match e {
        PlannerError::UnknownWaypoint(_) => StatusCode::NOT_FOUND,
        PlannerError::UnknownStation(_) => StatusCode::BAD_REQUEST,
    };
    error(status, e.to_string())
}

/// Current simulator outputs.
///
/// `GET /simulator` → 200 + `SimulatorSnapshot` JSON
pub async fn get_simulator(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimulatorSnapshot>, ApiError> {
    state.sim.snapshot().await.map(Json).map_err(unavailable)
}

/// Toggles a terminal and mirrors the new flags into the planner.
///
/// `POST /simulator/toggle/{ac|dc}` → 200 + `ToggleResponse`
/// `POST /simulator/toggle/xx` → 400
pub async fn toggle_channel(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let channel: Channel = channel
        .parse()
        .map_err(|e: String| error(StatusCode::BAD_REQUEST, e))?;

    state.sim.toggle(channel).await.map_err(unavailable)?;
    let snapshot = state.sim.snapshot().await.map_err(unavailable)?;

    let mut planner = state.planner.lock().await;
    let b2h = sync::b2h_flags_from_terminals(&snapshot.ac, &snapshot.dc, &planner.b2h_state());
    planner.update_b2h_state(b2h);

    let is_on = match channel {
        Channel::Ac => snapshot.ac.is_on,
        Channel::Dc => snapshot.dc.is_on,
    };
    Ok(Json(ToggleResponse {
        channel,
        is_on,
        b2h,
    }))
}

/// Emergency stop for every live terminal.
///
/// `POST /simulator/stop` → 200 + `StopResponse`
pub async fn stop_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StopResponse>, ApiError> {
    let stopped = state.sim.stop_all().await.map_err(unavailable)?;
    let snapshot = state.sim.snapshot().await.map_err(unavailable)?;

    let mut planner = state.planner.lock().await;
    let b2h = sync::b2h_flags_from_terminals(&snapshot.ac, &snapshot.dc, &planner.b2h_state());
    planner.update_b2h_state(b2h);

    Ok(Json(StopResponse { stopped, b2h }))
}

/// Sets the B2H export budget.
///
/// `PUT /simulator/usage-limit` → 200 + `UsageLimit`
pub async fn put_usage_limit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UsageLimitRequest>,
) -> Result<Json<UsageLimit>, ApiError> {
    state
        .sim
        .set_usage_limit(req.percent)
        .await
        .map(Json)
        .map_err(unavailable)
}

/// Latest journey calculation.
///
/// `GET /journey` → 200 + `JourneyCalculation`
pub async fn get_journey(State(state): State<Arc<AppState>>) -> Json<JourneyCalculation> {
    Json(state.planner.lock().await.calculation().clone())
}

/// Replaces the station selection.
///
/// `PUT /journey/stations` → 200, or 400 for an unknown station id
pub async fn put_stations(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectStationsRequest>,
) -> Result<Json<JourneyCalculation>, ApiError> {
    let mut planner = state.planner.lock().await;
    planner.select_stations(&req.stations).map_err(planner_error)?;
    Ok(Json(planner.calculation().clone()))
}

/// Sets one stop's requested departure SOC.
///
/// `PUT /journey/target-soc` → 200, or 404 for an unknown waypoint
pub async fn put_target_soc(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TargetSocRequest>,
) -> Result<Json<JourneyCalculation>, ApiError> {
    if !req.soc.is_finite() {
        return Err(error(StatusCode::BAD_REQUEST, "soc must be a finite number"));
    }
    let mut planner = state.planner.lock().await;
    planner
        .update_target_soc(&req.waypoint_id, req.soc)
        .map_err(planner_error)?;
    Ok(Json(planner.calculation().clone()))
}

/// Updates the planner's B2H draw and switches the terminals to match.
///
/// `PUT /journey/b2h` → 200 + `JourneyCalculation`
pub async fn put_b2h(
    State(state): State<Arc<AppState>>,
    Json(req): Json<B2hUpdateRequest>,
) -> Result<Json<JourneyCalculation>, ApiError> {
    let (b2h, calculation) = {
        let mut planner = state.planner.lock().await;
        let b2h = req.apply(planner.b2h_state());
        planner.update_b2h_state(b2h);
        (b2h, planner.calculation().clone())
    };

    let snapshot = state.sim.snapshot().await.map_err(unavailable)?;
    for channel in sync::toggles_to_match(&snapshot.ac, &snapshot.dc, &b2h) {
        let on = match channel {
            Channel::Ac => b2h.ac_on,
            Channel::Dc => b2h.dc_on,
        };
        state
            .sim
            .set_channel(channel, on)
            .await
            .map_err(unavailable)?;
    }

    Ok(Json(calculation))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::sim::actor::SimHandle;

    fn make_test_state() -> Arc<AppState> {
        let cfg = ScenarioConfig::demo();
        let sim = SimHandle::spawn_manual(cfg.build_simulator().unwrap());
        Arc::new(AppState::new(sim, cfg.build_planner().unwrap()))
    }

    async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header("content-type", "application/json");
        }
        let req = req
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let resp = router(Arc::clone(state)).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn simulator_returns_200() {
        let state = make_test_state();
        let (status, json) = send(&state, "GET", "/simulator", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["battery"]["soc"], 72.0);
        assert_eq!(json["estimated_remaining_time"], "—");
    }

    #[tokio::test]
    async fn toggle_mirrors_into_planner() {
        let state = make_test_state();
        let (status, json) = send(&state, "POST", "/simulator/toggle/dc", None).await;
        assert_eq!(status, StatusCode::OK);
        // demo planner starts with DC on; the terminal starts off and now turns on
        assert_eq!(json["is_on"], true);
        assert_eq!(json["b2h"]["dc_on"], true);

        let (_, json) = send(&state, "POST", "/simulator/toggle/dc", None).await;
        assert_eq!(json["is_on"], false);
        assert!(!state.planner.lock().await.b2h_state().dc_on);
    }

    #[tokio::test]
    async fn toggle_unknown_channel_returns_400() {
        let state = make_test_state();
        let (status, json) = send(&state, "POST", "/simulator/toggle/hv", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn journey_returns_plan() {
        let state = make_test_state();
        let (status, json) = send(&state, "GET", "/journey", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["journey"]["segments"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn stations_update_and_reject_unknown() {
        let state = make_test_state();
        let (status, json) = send(
            &state,
            "PUT",
            "/journey/stations",
            Some(r#"{"stations":[]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["journey"]["segments"].as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            &state,
            "PUT",
            "/journey/stations",
            Some(r#"{"stations":["st-nowhere"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn target_soc_unknown_waypoint_returns_404() {
        let state = make_test_state();
        let (status, _) = send(
            &state,
            "PUT",
            "/journey/target-soc",
            Some(r#"{"waypoint_id":"wp-charge-9","soc":90}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn b2h_update_switches_terminals() {
        let state = make_test_state();
        let (status, json) = send(
            &state,
            "PUT",
            "/journey/b2h",
            Some(r#"{"dc_on":false}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["b2h"]["dc_on"], false);

        let snapshot = state.sim.snapshot().await.unwrap();
        assert!(snapshot.ac.is_on);
        assert!(!snapshot.dc.is_on);
    }

    #[tokio::test]
    async fn stop_switches_off_both_terminals() {
        let state = make_test_state();
        send(&state, "POST", "/simulator/toggle/ac", None).await;
        send(&state, "POST", "/simulator/toggle/dc", None).await;
        state.sim.tick().await.unwrap();

        let (status, json) = send(&state, "POST", "/simulator/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stopped"], serde_json::json!(["ac", "dc"]));
        assert_eq!(json["b2h"]["ac_on"], false);
        assert_eq!(json["b2h"]["dc_on"], false);

        let snapshot = state.sim.snapshot().await.unwrap();
        assert_eq!(snapshot.ac_phase, "ramp_down");
        assert_eq!(snapshot.dc_phase, "ramp_down");
        assert_eq!(snapshot.active_channel_count, 0);

        let (_, json) = send(&state, "POST", "/simulator/stop", None).await;
        assert_eq!(json["stopped"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn usage_limit_is_clamped() {
        let state = make_test_state();
        let (status, json) = send(
            &state,
            "PUT",
            "/simulator/usage-limit",
            Some(r#"{"percent":90}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["percent"], 47.0);
    }
}
