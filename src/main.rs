/// flowrun server entry point
///
/// Loads configuration from the environment and serves the editor API.

use flowrun::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Graph editing at /api/flow, /api/nodes/*, /api/edges/*
/// - Run control at /api/run/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
