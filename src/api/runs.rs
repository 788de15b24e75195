/// Run control endpoints
///
/// `start` answers once a manual run finishes, or as soon as a schedule loop
/// is armed. `status` is what the editor polls for the node highlight.

use crate::{
    api::{ApiResult, AppState},
    runtime::{ControllerStatus, StartOutcome},
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

/// Create run control routes
pub fn create_run_routes() -> Router<AppState> {
    Router::new()
        .route("/api/run/start", post(start_run))
        .route("/api/run/stop", post(stop_run))
        .route("/api/run/status", get(run_status))
}

/// Validate the graph and start a run or loop
///
/// POST /api/run/start
/// Returns: { "mode": "completed", "report": {...} } | { "mode": "armed", ... } | { "mode": "cancelled" }
async fn start_run(State(state): State<AppState>) -> ApiResult<Json<StartOutcome>> {
    let outcome = state.controller.start().await?;
    Ok(Json(outcome))
}

/// POST /api/run/stop
async fn stop_run(State(state): State<AppState>) -> Json<Value> {
    let stopped = state.controller.stop().await;
    Json(json!({ "stopped": stopped }))
}

/// GET /api/run/status
async fn run_status(State(state): State<AppState>) -> Json<ControllerStatus> {
    Json(state.controller.status().await)
}
