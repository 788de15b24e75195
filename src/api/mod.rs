/// HTTP API Layer
///
/// REST surface for the hosting editor: graph editing, saved flows, and
/// run control. Graph edits are refused with 423 while a run or loop holds
/// the lock.

use crate::{
    error::{ControllerError, EngineError, GraphError},
    nodes::NodeHandlerRegistry,
    runtime::RunController,
    workflow::{graph::SharedGraph, storage::FlowStorage},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

// Graph editing and saved flows
pub mod flow;

// Start/stop/status of runs
pub mod runs;

pub use flow::create_flow_routes;
pub use runs::create_run_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// The single live graph the editor works on
    pub graph: SharedGraph,
    /// Run/loop controller over that graph
    pub controller: Arc<RunController>,
    /// Handlers, used for the palette and default node data
    pub registry: Arc<NodeHandlerRegistry>,
    /// Saved flow snapshots
    pub storage: FlowStorage,
}

/// Error answered as `{ "error": "..." }` with a matching status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The graph is locked by an active run or loop
    pub fn locked() -> Self {
        Self::new(
            StatusCode::LOCKED,
            "Flow is running; stop it before editing the graph",
        )
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        tracing::error!("❌ Internal error: {}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<GraphError> for ApiError {
    fn from(error: GraphError) -> Self {
        let status = match error {
            GraphError::DuplicateNode(_) | GraphError::DuplicateEdge(_) => StatusCode::CONFLICT,
            GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, error.to_string())
    }
}

impl From<ControllerError> for ApiError {
    fn from(error: ControllerError) -> Self {
        let status = match error {
            ControllerError::AlreadyActive | ControllerError::Engine(EngineError::ConcurrentRun) => {
                StatusCode::CONFLICT
            }
            ControllerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ControllerError::Engine(EngineError::TriggerNotFound(_)) => StatusCode::NOT_FOUND,
        };
        Self::new(status, error.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
