#![allow(dead_code)]

use async_trait::async_trait;
use flowrun::{
    nodes::NodeHandlerRegistry,
    runtime::{http::HttpFailure, HttpClient, HttpOutcome, HttpRequestSpec},
    Edge, ExecutionEngine, FlowGraph, Node, NodeData, NodeKind, SharedGraph,
};
use serde_json::Value;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// HTTP collaborator answering every request with the same outcome
pub struct StubHttp {
    pub outcome: HttpOutcome,
    pub requests: Mutex<Vec<HttpRequestSpec>>,
}

impl StubHttp {
    pub fn ok(status: u16, data: Value) -> Arc<Self> {
        Arc::new(Self {
            outcome: HttpOutcome::ok(status, data),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: HttpOutcome::failed(HttpFailure::message(message)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for StubHttp {
    async fn perform_request(&self, request: &HttpRequestSpec) -> HttpOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }
}

pub fn registry(http: Arc<StubHttp>) -> Arc<NodeHandlerRegistry> {
    Arc::new(NodeHandlerRegistry::with_defaults(http))
}

/// Engine without pacing
pub fn engine(http: Arc<StubHttp>) -> Arc<ExecutionEngine> {
    Arc::new(ExecutionEngine::new(registry(http), Duration::ZERO))
}

/// Node with its kind's default data plus `fields`
pub fn node(id: &str, kind: NodeKind, fields: Value) -> Node {
    let registry = NodeHandlerRegistry::with_defaults(StubHttp::ok(200, Value::Null));
    let mut data: NodeData = registry.default_data(kind).unwrap_or_default();
    if let Value::Object(fields) = fields {
        data.extend(fields);
    }
    Node::new(id, kind, data)
}

pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> SharedGraph {
    let mut graph = FlowGraph::new();
    for node in nodes {
        graph.add_node(node).unwrap();
    }
    for edge in edges {
        graph.add_edge(edge).unwrap();
    }
    graph.into_shared()
}

pub async fn data_of(graph: &SharedGraph, id: &str) -> NodeData {
    graph.read().await.node_by_id(id).unwrap().data.clone()
}

pub async fn edge_of(graph: &SharedGraph, id: &str) -> Edge {
    graph.read().await.edge_by_id(id).unwrap().clone()
}
