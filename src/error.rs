/// Error types for graph editing, validation, execution and run control
///
/// Dangling edges and failed HTTP requests are deliberately absent: they never
/// abort a run and are recorded in the run report and in node/edge state instead.

use thiserror::Error;

/// Errors raised by structural graph edits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node already exists: {0}")]
    DuplicateNode(String),
    #[error("Edge already exists: {0}")]
    DuplicateEdge(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),
}

/// Graph validation failures reported before a run starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No trigger or schedule node with an outgoing edge found to start the flow")]
    NoTrigger,
    #[error("Only one trigger or schedule node may start the flow, found {}: {}", .0.len(), .0.join(", "))]
    MultipleTriggers(Vec<String>),
    #[error("Node '{node_id}' is missing required field '{field}'")]
    MissingData { node_id: String, field: String },
    #[error("Schedule node '{node_id}' has an invalid repeat interval: {reason}")]
    InvalidInterval { node_id: String, reason: String },
}

/// Errors returned by a single engine run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("A run is already in flight")]
    ConcurrentRun,
    #[error("Trigger node not found: {0}")]
    TriggerNotFound(String),
}

/// Errors returned by the run/loop controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("A run or loop is already active; stop it first")]
    AlreadyActive,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
