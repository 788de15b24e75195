/// Flow Model Layer
///
/// This module holds the user-built graph and everything needed to keep it:
/// - Type definitions (Node, Edge, FlowSnapshot)
/// - The in-memory graph with lookup and patch operations
/// - Pure edge annotation updates
/// - SQLite persistence of snapshots with sqlx

// Core flow type definitions
pub mod types;

// In-memory graph model shared by engine and API
pub mod graph;

// Pure edge state updates
pub mod edge_state;

// SQLite persistence layer for flow snapshots
pub mod storage;

// Re-export commonly used types
pub use graph::{FlowGraph, SharedGraph};
pub use types::{Edge, EdgeData, EdgeKind, FlowSnapshot, Node, NodeData, NodeKind, Position};
