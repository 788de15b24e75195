/// Graph editing and saved-flow endpoints
///
/// Every mutating route takes the graph write lock, then checks the
/// controller lock under it and answers 423 while a run or loop is active.

use crate::{
    api::{ApiError, ApiResult, AppState},
    workflow::{
        graph::FlowGraph,
        storage::DEFAULT_FLOW_NAME,
        types::{Edge, FlowSnapshot, Node, NodeData, NodeKind, Position},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLockWriteGuard;

/// One palette entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeKindInfo {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub trigger_capable: bool,
    pub default_data: NodeData,
}

/// Request body for node creation
#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
}

/// Request body for edge creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEdgeRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// Optional body for save/load
#[derive(Debug, Default, Deserialize)]
pub struct FlowNameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

impl FlowNameRequest {
    fn name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FLOW_NAME)
    }
}

/// Create graph editing routes
pub fn create_flow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/node-kinds", get(list_node_kinds))
        .route("/api/flow", get(get_flow).put(replace_flow))
        .route("/api/flow/reset", post(reset_flow))
        .route("/api/flow/save", post(save_flow))
        .route("/api/flow/load", post(load_flow))
        .route("/api/flows", get(list_saved_flows))
        .route("/api/flows/{name}", delete(delete_saved_flow))
        .route("/api/nodes", post(create_node))
        .route("/api/nodes/{id}", delete(delete_node))
        .route("/api/nodes/{id}/data", patch(update_node_data))
        .route("/api/edges", post(create_edge))
        .route("/api/edges/{id}", delete(delete_edge))
}

/// Write access to the graph, refused while a run or loop holds the lock
async fn edit_graph(state: &AppState) -> ApiResult<RwLockWriteGuard<'_, FlowGraph>> {
    let graph = state.graph.write().await;
    if state.controller.is_locked() {
        tracing::warn!("🔒 Graph edit rejected while the flow is running");
        return Err(ApiError::locked());
    }
    Ok(graph)
}

/// Next free `node_N` id
fn next_node_id(graph: &FlowGraph) -> String {
    let next = graph
        .nodes()
        .iter()
        .filter_map(|node| node.id.strip_prefix("node_")?.parse::<u64>().ok())
        .max()
        .map_or(0, |max| max.saturating_add(1));
    format!("node_{}", next)
}

/// Palette of node kinds with their default data
///
/// GET /api/node-kinds
async fn list_node_kinds(State(state): State<AppState>) -> Json<Vec<NodeKindInfo>> {
    Json(
        state
            .registry
            .kinds()
            .into_iter()
            .map(|kind| NodeKindInfo {
                kind,
                trigger_capable: kind.is_trigger_capable(),
                default_data: state.registry.default_data(kind).unwrap_or_default(),
            })
            .collect(),
    )
}

/// GET /api/flow
async fn get_flow(State(state): State<AppState>) -> Json<FlowSnapshot> {
    Json(state.graph.read().await.snapshot())
}

/// Replace the whole graph with an uploaded snapshot
///
/// PUT /api/flow
async fn replace_flow(
    State(state): State<AppState>,
    Json(snapshot): Json<FlowSnapshot>,
) -> ApiResult<Json<FlowSnapshot>> {
    let mut graph = edit_graph(&state).await?;
    graph.load(snapshot);
    tracing::info!("📥 Replaced flow ({} nodes, {} edges)", graph.nodes().len(), graph.edges().len());
    Ok(Json(graph.snapshot()))
}

/// POST /api/flow/reset
async fn reset_flow(State(state): State<AppState>) -> ApiResult<StatusCode> {
    edit_graph(&state).await?.clear();
    tracing::info!("🧹 Flow cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Persist the current graph under a name
///
/// POST /api/flow/save
/// Body (optional): { "name": "..." }
async fn save_flow(
    State(state): State<AppState>,
    body: Option<Json<FlowNameRequest>>,
) -> ApiResult<Json<Value>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let snapshot = state.graph.read().await.snapshot();
    state
        .storage
        .save_flow(request.name(), &snapshot)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!("💾 Saved flow '{}'", request.name());
    Ok(Json(json!({
        "name": request.name(),
        "nodes": snapshot.nodes.len(),
        "edges": snapshot.edges.len(),
    })))
}

/// Replace the graph with a saved snapshot
///
/// POST /api/flow/load
/// Body (optional): { "name": "..." }
async fn load_flow(
    State(state): State<AppState>,
    body: Option<Json<FlowNameRequest>>,
) -> ApiResult<Json<FlowSnapshot>> {
    let mut graph = edit_graph(&state).await?;
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let snapshot = state
        .storage
        .load_flow(request.name())
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("No saved flow named '{}'", request.name()),
            )
        })?;

    graph.load(snapshot);
    tracing::info!("📂 Loaded flow '{}'", request.name());
    Ok(Json(graph.snapshot()))
}

/// GET /api/flows
async fn list_saved_flows(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let flows = state.storage.list_flows().await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "flows": flows })))
}

/// DELETE /api/flows/{name}
async fn delete_saved_flow(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.storage.delete_flow(&name).await.map_err(ApiError::internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("No saved flow named '{}'", name),
        ))
    }
}

/// Add a node with its kind's default data
///
/// POST /api/nodes
/// Body: { "type": "calculator", "id": "node_3"?, "position": {"x": 0, "y": 0}? }
async fn create_node(
    State(state): State<AppState>,
    Json(request): Json<CreateNodeRequest>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    let data = state.registry.default_data(request.kind).unwrap_or_default();

    let mut graph = edit_graph(&state).await?;
    let id = request.id.unwrap_or_else(|| next_node_id(&graph));
    let mut node = Node::new(id, request.kind, data);
    node.position = request.position;

    graph.add_node(node.clone())?;
    tracing::debug!("➕ Added node '{}' ({})", node.id, node.kind);
    Ok((StatusCode::CREATED, Json(node)))
}

/// Merge a partial patch into a node's data
///
/// PATCH /api/nodes/{id}/data
/// Body: { "value": 5 }
async fn update_node_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<NodeData>,
) -> ApiResult<Json<Node>> {
    let mut graph = edit_graph(&state).await?;
    graph.merge_node_data(&id, patch)?;
    let node = graph
        .node_by_id(&id)
        .cloned()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Node not found: {}", id)))?;
    Ok(Json(node))
}

/// DELETE /api/nodes/{id}
async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    edit_graph(&state).await?.remove_node(&id)?;
    tracing::debug!("➖ Removed node '{}' and its edges", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Connect two handles
///
/// POST /api/edges
/// Body: { "source": "node_0", "target": "node_1", "sourceHandle": "true-output"? }
async fn create_edge(
    State(state): State<AppState>,
    Json(request): Json<CreateEdgeRequest>,
) -> ApiResult<(StatusCode, Json<Edge>)> {
    let mut graph = edit_graph(&state).await?;
    let id = request.id.clone().unwrap_or_else(|| {
        format!(
            "edge-{}{}-{}{}",
            request.source,
            request.source_handle.as_deref().unwrap_or_default(),
            request.target,
            request.target_handle.as_deref().unwrap_or_default()
        )
    });

    let mut edge = Edge::new(id, request.source, request.target);
    edge.source_handle = request.source_handle;
    edge.target_handle = request.target_handle;

    graph.add_edge(edge.clone())?;
    tracing::debug!("🔗 Connected '{}' -> '{}'", edge.source, edge.target);
    Ok((StatusCode::CREATED, Json(edge)))
}

/// DELETE /api/edges/{id}
async fn delete_edge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    edit_graph(&state).await?.remove_edge(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn node_ids_continue_after_highest_suffix() {
        let mut graph = FlowGraph::new();
        assert_eq!(next_node_id(&graph), "node_0");

        graph.add_node(Node::new("node_4", NodeKind::Number, Map::new())).unwrap();
        graph.add_node(Node::new("custom", NodeKind::Number, Map::new())).unwrap();
        assert_eq!(next_node_id(&graph), "node_5");

        graph
            .add_node(Node::new(format!("node_{}", u64::MAX), NodeKind::Number, Map::new()))
            .unwrap();
        assert_eq!(next_node_id(&graph), format!("node_{}", u64::MAX));
    }

    #[test]
    fn blank_flow_name_uses_default() {
        let request = FlowNameRequest {
            name: Some("  ".to_string()),
        };
        assert_eq!(request.name(), DEFAULT_FLOW_NAME);
        assert_eq!(FlowNameRequest::default().name(), DEFAULT_FLOW_NAME);
    }
}
