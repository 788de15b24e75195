/// In-memory flow graph
///
/// Holds the nodes and edges the user assembled and exposes the lookups the
/// engine needs. All operations are synchronous and only touch this graph.

use crate::error::GraphError;
use crate::workflow::edge_state::{reset_edge_state, set_edge_state};
use crate::workflow::types::{Edge, EdgeKind, FlowSnapshot, Node, NodeData, RUNNING_FLAG};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Graph shared between the engine, the controller and the hosting API
pub type SharedGraph = Arc<RwLock<FlowGraph>>;

/// Nodes and edges of a single flow, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Node currently highlighted as executing
    executing_node_id: Option<String>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a graph for sharing across tasks
    pub fn into_shared(self) -> SharedGraph {
        Arc::new(RwLock::new(self))
    }

    /// Build a graph from a persisted snapshot, resetting transient run flags
    pub fn from_snapshot(snapshot: FlowSnapshot) -> Self {
        let mut graph = Self::new();
        graph.load(snapshot);
        graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge_by_id(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    /// Outgoing edges of a node, in insertion order
    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source == node_id)
    }

    /// Incoming edges of a node, in insertion order
    pub fn edges_to<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == node_id)
    }

    /// Add a node; ids must be unique
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node_by_id(&node.id).is_some() {
            return Err(GraphError::DuplicateNode(node.id));
        }
        tracing::debug!("➕ Added node: '{}' (type: {})", node.id, node.kind);
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge; ids must be unique
    ///
    /// Endpoints are not checked here. An edge pointing at a missing node is
    /// skipped during traversal instead.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edge_by_id(&edge.id).is_some() {
            return Err(GraphError::DuplicateEdge(edge.id));
        }
        tracing::debug!("🔗 Added edge: '{}' → '{}'", edge.source, edge.target);
        self.edges.push(edge);
        Ok(())
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|node| node.id == node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        self.edges
            .retain(|edge| edge.source != node_id && edge.target != node_id);
        if self.executing_node_id.as_deref() == Some(node_id) {
            self.executing_node_id = None;
        }
        Ok(self.nodes.remove(index))
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    /// Shallow-merge `patch` into the node's data, keeping unspecified fields
    pub fn merge_node_data(&mut self, node_id: &str, patch: NodeData) -> Result<(), GraphError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        for (field, value) in patch {
            node.data.insert(field, value);
        }
        Ok(())
    }

    /// Annotate one edge and return its updated form
    pub fn set_edge_state(
        &mut self,
        edge_id: &str,
        visual_kind: EdgeKind,
        is_active: bool,
        is_success: Option<bool>,
    ) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|edge| edge.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        *edge = set_edge_state(edge, visual_kind, is_active, is_success);
        Ok(edge.clone())
    }

    /// Clear every edge annotation back to plain and inactive
    pub fn reset_edge_states(&mut self) {
        for edge in &mut self.edges {
            *edge = reset_edge_state(edge);
        }
    }

    pub fn executing_node_id(&self) -> Option<&str> {
        self.executing_node_id.as_deref()
    }

    /// Mark one node (or none) as executing and sync every node's highlight flag
    pub fn set_executing(&mut self, node_id: Option<&str>) {
        self.executing_node_id = node_id.map(str::to_string);
        for node in &mut self.nodes {
            let running = node_id == Some(node.id.as_str());
            node.data.insert(RUNNING_FLAG.to_string(), Value::Bool(running));
        }
    }

    /// Drop the executing marker and turn every highlight off
    pub fn clear_running_flags(&mut self) {
        self.set_executing(None);
    }

    /// Trigger-capable nodes that have at least one outgoing edge
    pub fn trigger_candidates(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| node.kind.is_trigger_capable())
            .filter(|node| self.edges_from(&node.id).next().is_some())
            .collect()
    }

    /// Ids of every node reachable from `start` along edges, `start` included
    ///
    /// Edges with a missing endpoint are ignored.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut reachable = HashSet::new();
        let Some(start) = self.node_by_id(start).map(|node| node.id.as_str()) else {
            return reachable;
        };
        let graph = self.to_graph_map();
        let mut dfs = Dfs::new(&graph, start);
        while let Some(id) = dfs.next(&graph) {
            reachable.insert(id.to_string());
        }
        reachable
    }

    /// Whether the edges form at least one cycle
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.to_graph_map())
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.executing_node_id = None;
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Replace the graph with a snapshot; every node starts un-highlighted
    pub fn load(&mut self, snapshot: FlowSnapshot) {
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
        self.clear_running_flags();
        tracing::debug!(
            "📥 Loaded flow with {} nodes and {} edges",
            self.nodes.len(),
            self.edges.len()
        );
    }

    fn to_graph_map(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.id.as_str());
        }
        for edge in &self.edges {
            if graph.contains_node(edge.source.as_str()) && graph.contains_node(edge.target.as_str()) {
                graph.add_edge(edge.source.as_str(), edge.target.as_str(), ());
            }
        }
        graph
    }
}
