/// Server setup and initialization
///
/// Wires together all components: flow storage, handler registry, execution
/// engine, run controller, and HTTP routes.

use crate::{
    api::{create_flow_routes, create_run_routes, AppState},
    config::Config,
    nodes::NodeHandlerRegistry,
    runtime::{ExecutionEngine, HttpClient, ReqwestHttpClient, RunController},
    workflow::{graph::FlowGraph, storage::FlowStorage},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the shared application state around an HTTP collaborator
pub async fn create_state(config: &Config, http_client: Arc<dyn HttpClient>) -> Result<AppState> {
    tracing::info!("🗄️ Initializing flow storage");
    let storage = FlowStorage::connect(&config.database.url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open flow database: {}", e))?;

    tracing::info!("📊 Registering node handlers");
    let registry = Arc::new(NodeHandlerRegistry::with_defaults(http_client));

    tracing::info!(
        "🚀 Initializing execution engine (pacing: {}ms)",
        config.engine.pacing_ms
    );
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&registry),
        config.engine.pacing(),
    ));

    let graph = FlowGraph::new().into_shared();
    let controller = Arc::new(RunController::new(graph.clone(), engine));

    Ok(AppState {
        graph,
        controller,
        registry,
        storage,
    })
}

/// Assemble the router for a prepared state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_flow_routes())
        .merge(create_run_routes())
        .with_state(state)
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!(
        "🌐 Initializing HTTP collaborator (timeout: {}s)",
        config.engine.http_timeout_secs
    );
    let http_client = Arc::new(ReqwestHttpClient::new(config.engine.http_timeout())?);

    let state = create_state(&config, http_client).await?;
    let app = create_router(state);

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting flowrun server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
