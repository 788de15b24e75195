/// Core flow type definitions
///
/// Nodes, edges and the persisted snapshot. These types are serialized with the
/// same field names the visual editor uses, so a saved canvas loads unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field-to-value record held by every node, schema depends on the node kind
pub type NodeData = Map<String, Value>;

/// Transient highlight flag the engine sets on the executing node
pub const RUNNING_FLAG: &str = "isRunning";

/// Output handle names used by branching nodes
pub const HANDLE_TRUE_OUTPUT: &str = "true-output";
pub const HANDLE_FALSE_OUTPUT: &str = "false-output";
pub const HANDLE_SUCCESS_OUTPUT: &str = "success-output";
pub const HANDLE_ERROR_OUTPUT: &str = "error-output";

/// Input handle names on the calculator node
pub const HANDLE_INPUT_A: &str = "inputA";
pub const HANDLE_INPUT_B: &str = "inputB";

/// Kinds of node that can be placed on the canvas
///
/// The editor's own type names (`triggerNode`, `customNumberNode`, ...) are
/// accepted on input so older snapshots keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Manual run start
    #[serde(alias = "triggerNode")]
    Trigger,

    /// Interval run start
    /// Data: { "cron", "delaySeconds", "repeatIntervalValue", "repeatIntervalUnit", "repeatCount" }
    #[serde(alias = "scheduleNode")]
    Schedule,

    /// Value source/sink
    /// Data: { "value": 0 }
    #[serde(alias = "customNumberNode")]
    Number,

    /// Binary aggregator fed through `inputA`/`inputB`
    /// Data: { "valueA", "valueB", "operation": "add" | "subtract" | "multiply" }
    #[serde(alias = "calculatorNode")]
    Calculator,

    /// Branch selector
    /// Data: { "condition", "result" }
    #[serde(alias = "ifElseNode")]
    IfElse,

    /// Branch selector that calls an external HTTP endpoint
    /// Data: { "url", "method", "headers", "body", "lastResponse", "lastStatus", "lastError" }
    #[serde(alias = "httpRequestNode")]
    HttpRequest,

    /// Response sink for display
    /// Data: { "lastResponse", "lastStatus", "lastError" }
    #[serde(alias = "weatherNode")]
    Weather,
}

impl NodeKind {
    /// Every built-in kind, in palette order
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Trigger,
        NodeKind::Schedule,
        NodeKind::Number,
        NodeKind::Calculator,
        NodeKind::IfElse,
        NodeKind::HttpRequest,
        NodeKind::Weather,
    ];

    /// Whether a node of this kind can start a run
    pub fn is_trigger_capable(self) -> bool {
        matches!(self, NodeKind::Trigger | NodeKind::Schedule)
    }

    /// Wire name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Schedule => "schedule",
            NodeKind::Number => "number",
            NodeKind::Calculator => "calculator",
            NodeKind::IfElse => "ifElse",
            NodeKind::HttpRequest => "httpRequest",
            NodeKind::Weather => "weather",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas coordinates, carried through persistence untouched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single node in the flow graph
///
/// Created with kind-specific default data, then mutated only by merging
/// partial patches into `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the graph (e.g. "node_0")
    pub id: String,
    /// The kind of node which determines execution behavior
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Kind-specific fields
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: NodeData,
    /// Canvas position (ignored by the engine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
            position: None,
        }
    }

    /// Whether the node is currently highlighted as executing
    pub fn is_running(&self) -> bool {
        self.data
            .get(RUNNING_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Visual/result annotation of an edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    #[default]
    #[serde(alias = "default", alias = "smoothstep", alias = "straight", alias = "step")]
    Plain,
    #[serde(alias = "successEdge")]
    Success,
    #[serde(alias = "errorEdge")]
    Error,
}

/// Per-edge run annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Directed connection between two nodes' named handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique edge identifier
    pub id: String,
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
    /// Output handle on the source node (e.g. "true-output")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input handle on the target node (e.g. "inputA")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Visual annotation set by the engine
    #[serde(rename = "type", default)]
    pub visual_kind: EdgeKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: EdgeData,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            visual_kind: EdgeKind::Plain,
            data: EdgeData::default(),
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

/// Persisted form of a graph: `{ "nodes": [...], "edges": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<NodeData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NodeData>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D>(deserializer: D) -> Result<EdgeData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<EdgeData>::deserialize(deserializer)?.unwrap_or_default())
}
