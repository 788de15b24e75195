/// Depth-first flow execution engine
///
/// Walks the graph from a trigger node, executes each node through its kind's
/// handler, annotates edges, routes values into target nodes and follows only
/// the live branch of branching nodes. Each node executes at most once per
/// run, which also makes cycles harmless.

use crate::error::EngineError;
use crate::nodes::{HandlerOutcome, NodeHandlerRegistry};
use crate::workflow::graph::SharedGraph;
use crate::workflow::types::{Edge, EdgeKind, Node, NodeData};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::HashSet,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use uuid::Uuid;

/// Default pause on each node so the UI can follow the highlight
pub const DEFAULT_PACING: Duration = Duration::from_millis(600);

/// Summary of one completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Node ids in the order they executed
    pub visited: Vec<String>,
    /// Edges skipped because an endpoint was missing
    pub skipped_edges: Vec<String>,
    /// Nodes whose handler reported an error (e.g. failed requests)
    pub errored_nodes: Vec<String>,
}

/// State owned by a single run, dropped when it ends
#[derive(Debug, Default)]
struct RunContext {
    visited: HashSet<String>,
    order: Vec<String>,
    skipped_edges: Vec<String>,
    errored_nodes: Vec<String>,
}

/// Releases the in-flight flag when the run ends, is cancelled, or panics
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Execution engine shared by manual and scheduled runs
///
/// Holds the system-wide in-flight flag: at most one run executes at a time.
#[derive(Debug)]
pub struct ExecutionEngine {
    /// Handlers for every node kind
    registry: Arc<NodeHandlerRegistry>,
    /// Pause applied after highlighting each node
    pacing: Duration,
    /// Set while a run is in progress
    in_flight: AtomicBool,
}

type VisitFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

impl ExecutionEngine {
    /// Create new execution engine with a handler registry and pacing delay
    pub fn new(registry: Arc<NodeHandlerRegistry>, pacing: Duration) -> Self {
        Self {
            registry,
            pacing,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<NodeHandlerRegistry> {
        &self.registry
    }

    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Result<InFlightGuard<'_>, EngineError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| InFlightGuard(&self.in_flight))
            .map_err(|_| EngineError::ConcurrentRun)
    }

    /// Execute one run from `trigger_node_id` until the DFS frontier is exhausted
    ///
    /// Rejected without touching the graph when another run is in flight or
    /// the trigger node does not exist.
    pub async fn run(&self, graph: &SharedGraph, trigger_node_id: &str) -> Result<RunReport, EngineError> {
        let _guard = self.try_acquire().inspect_err(|_| {
            tracing::warn!("⏭️ A run is already in progress, rejecting run from '{}'", trigger_node_id);
        })?;

        if graph.read().await.node_by_id(trigger_node_id).is_none() {
            return Err(EngineError::TriggerNotFound(trigger_node_id.to_string()));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_start_time = Instant::now();
        tracing::info!("🚀 Starting run {} from node: {}", run_id, trigger_node_id);

        graph.write().await.reset_edge_states();

        let mut context = RunContext::default();
        self.visit(graph, &mut context, trigger_node_id.to_string(), None).await;

        graph.write().await.clear_running_flags();

        let duration = run_start_time.elapsed();
        tracing::info!(
            "🎉 Run {} completed: {} nodes visited, {} edges skipped, {} node errors in {:?}",
            run_id,
            context.order.len(),
            context.skipped_edges.len(),
            context.errored_nodes.len(),
            duration
        );

        Ok(RunReport {
            run_id,
            trigger_id: trigger_node_id.to_string(),
            started_at,
            duration_ms: duration.as_millis() as u64,
            visited: context.order,
            skipped_edges: context.skipped_edges,
            errored_nodes: context.errored_nodes,
        })
    }

    async fn pace(&self) {
        if self.pacing.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.pacing).await;
        }
    }

    /// Visit one node, then recurse along its live outgoing edges
    fn visit<'a>(
        &'a self,
        graph: &'a SharedGraph,
        context: &'a mut RunContext,
        node_id: String,
        incoming: Option<Value>,
    ) -> VisitFuture<'a> {
        Box::pin(async move {
            if !context.visited.insert(node_id.clone()) {
                tracing::debug!("↩️ Node '{}' already executed in this run, not re-entering", node_id);
                return;
            }
            context.order.push(node_id.clone());

            graph.write().await.set_executing(Some(&node_id));
            self.pace().await;

            let node = graph.read().await.node_by_id(&node_id).cloned();
            let Some(node) = node else {
                tracing::error!("❌ Node with ID '{}' not found", node_id);
                return;
            };

            tracing::info!("📍 Executing node '{}' (type: {})", node.id, node.kind);
            let outcome = self.execute_node(&node, incoming.as_ref()).await;

            if let Some(patch) = outcome.data_patch.clone() {
                if let Err(e) = graph.write().await.merge_node_data(&node.id, patch) {
                    tracing::warn!("⚠️ Could not patch node '{}': {}", node.id, e);
                }
            }
            if outcome.errored {
                context.errored_nodes.push(node.id.clone());
            }

            let (edges, upstream) = {
                let graph = graph.read().await;
                let edges: Vec<Edge> = graph.edges_from(&node.id).cloned().collect();
                let upstream = graph
                    .node_by_id(&node.id)
                    .map(|current| current.data.clone())
                    .unwrap_or_default();
                (edges, upstream)
            };

            for edge in edges {
                let live = match outcome.branch_handle.as_deref() {
                    None => true,
                    Some(handle) => edge.source_handle.as_deref() == Some(handle),
                };
                if !live {
                    self.mark_edge(graph, &edge, EdgeKind::Error, false).await;
                    continue;
                }

                let target = graph.read().await.node_by_id(&edge.target).cloned();
                let Some(target) = target else {
                    tracing::warn!(
                        "⚠️ Target node '{}' for edge '{}' not found, skipping",
                        edge.target,
                        edge.id
                    );
                    context.skipped_edges.push(edge.id.clone());
                    self.mark_edge(graph, &edge, EdgeKind::Error, false).await;
                    continue;
                };

                self.mark_edge(graph, &edge, EdgeKind::Success, true).await;
                self.route_into(graph, &edge, &target, outcome.value.as_ref(), &upstream)
                    .await;

                self.visit(graph, context, target.id, outcome.value.clone()).await;
            }
        })
    }

    async fn execute_node(&self, node: &Node, incoming: Option<&Value>) -> HandlerOutcome {
        let node_start_time = Instant::now();
        let Some(handler) = self.registry.get(node.kind) else {
            tracing::warn!("⚠️ No handler registered for '{}', passing value through", node.kind);
            return HandlerOutcome::pass(incoming.cloned());
        };

        let outcome = handler.execute(&node.data, incoming).await;
        tracing::debug!(
            "✅ Node '{}' completed in {:?} (branch: {:?}, errored: {})",
            node.id,
            node_start_time.elapsed(),
            outcome.branch_handle,
            outcome.errored
        );
        outcome
    }

    /// Let the target's handler accept the value arriving over `edge`
    async fn route_into(
        &self,
        graph: &SharedGraph,
        edge: &Edge,
        target: &Node,
        value: Option<&Value>,
        upstream: &NodeData,
    ) {
        let Some(handler) = self.registry.get(target.kind) else {
            return;
        };
        if let Some(patch) = handler.route_input(edge, value, upstream) {
            tracing::debug!("📥 Routing into '{}' via '{}': {:?}", target.id, edge.id, patch);
            if let Err(e) = graph.write().await.merge_node_data(&target.id, patch) {
                tracing::warn!("⚠️ Could not route into node '{}': {}", target.id, e);
            }
        }
    }

    async fn mark_edge(&self, graph: &SharedGraph, edge: &Edge, kind: EdgeKind, active: bool) {
        if let Err(e) = graph
            .write()
            .await
            .set_edge_state(&edge.id, kind, active, Some(active))
        {
            tracing::warn!("⚠️ Could not mark edge '{}': {}", edge.id, e);
        }
    }
}
