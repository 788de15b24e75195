/// flowrun: visual flow graph execution engine
///
/// Holds a directed graph of typed nodes, runs it depth-first from a single
/// trigger, annotates edges with the branch taken, and repeats runs on an
/// interval for schedule triggers.

// Core configuration and setup
pub mod config;

// Typed errors for graph edits, validation, runs and run control
pub mod error;

// Graph model, edge state and saved-flow storage
pub mod workflow;

// Per-kind node handlers and their registry
pub mod nodes;

// Execution engine, run/loop controller and HTTP collaborator
pub mod runtime;

// HTTP API layer for the hosting editor
pub mod api;

// Server setup and initialization
pub mod server;

pub use error::{ControllerError, EngineError, GraphError, ValidationError};
pub use nodes::{NodeHandler, NodeHandlerRegistry};
pub use runtime::{ExecutionEngine, RunController, RunPhase, RunReport};
pub use server::start_server;
pub use workflow::{Edge, EdgeKind, FlowGraph, FlowSnapshot, Node, NodeData, NodeKind, SharedGraph};
