//! REST API over the running simulator and the journey planner.
//!
//! - `GET /simulator` and `POST /simulator/toggle/{channel}`
//! - `POST /simulator/stop`, `PUT /simulator/usage-limit`
//! - `GET /journey`, `PUT /journey/stations`, `PUT /journey/target-soc`, `PUT /journey/b2h`
//!
//! Handlers act as the host that keeps the B2H flags of both sides in step.

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tokio::sync::Mutex;
use tracing::info;

use crate::journey::JourneyPlanner;
use crate::sim::actor::SimHandle;

/// State shared across all request handlers.
///
/// The simulator lives on its own task behind `sim`; the planner is
/// recomputed in place under the mutex.
pub struct AppState {
    pub sim: SimHandle,
    pub planner: Mutex<JourneyPlanner>,
}

impl AppState {
    pub fn new(sim: SimHandle, planner: JourneyPlanner) -> Self {
        Self {
            sim,
            planner: Mutex::new(planner),
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/simulator", get(handlers::get_simulator))
        .route("/simulator/toggle/{channel}", post(handlers::toggle_channel))
        .route("/simulator/stop", post(handlers::stop_all))
        .route("/simulator/usage-limit", put(handlers::put_usage_limit))
        .route("/journey", get(handlers::get_journey))
        .route("/journey/stations", put(handlers::put_stations))
        .route("/journey/target-soc", put(handlers::put_target_soc))
        .route("/journey/b2h", put(handlers::put_b2h))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
