/// Runtime
///
/// Everything that moves a flow: the depth-first execution engine, the
/// run/loop controller that drives it, and the HTTP collaborator used by
/// request nodes.

// Depth-first run over the shared graph
pub mod engine;

// Manual runs, schedule loops and the edit lock
pub mod controller;

// Outbound HTTP for httpRequest nodes
pub mod http;

pub use controller::{ControllerStatus, RunController, RunPhase, StartOutcome};
pub use engine::{ExecutionEngine, RunReport, DEFAULT_PACING};
pub use http::{HttpClient, HttpOutcome, HttpRequestSpec, ReqwestHttpClient};
