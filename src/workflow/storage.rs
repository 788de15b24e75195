/// SQLite persistence layer for flow snapshots
///
/// Stores named `{nodes, edges}` snapshots as JSON. Loading goes through
/// `FlowGraph::load`, which resets every node's running flag.

use crate::workflow::types::FlowSnapshot;
use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::str::FromStr;

/// Name used when the caller does not pick one
pub const DEFAULT_FLOW_NAME: &str = "flow";

/// SQLite-based flow snapshot storage
#[derive(Debug, Clone)]
pub struct FlowStorage {
    /// SQLite connection pool for the flow database
    pool: SqlitePool,
}

impl FlowStorage {
    /// Create new storage instance with an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and initialize the schema
    ///
    /// In-memory databases are pinned to a single connection so every query
    /// sees the same database.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| anyhow::anyhow!("Invalid database url '{}': {}", url, e))?
            .create_if_missing(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        tracing::info!("🗄️ Opening flow database: {}", url);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the flow storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flows (
                name TEXT PRIMARY KEY,
                snapshot JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a snapshot under `name`, replacing any previous one
    pub async fn save_flow(&self, name: &str, snapshot: &FlowSnapshot) -> Result<()> {
        let snapshot_json = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO flows (name, snapshot, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(name) DO UPDATE SET
                snapshot = excluded.snapshot,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(&snapshot_json)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "💾 Saved flow '{}' ({} nodes, {} edges)",
            name,
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok(())
    }

    /// Retrieve a snapshot by name
    pub async fn load_flow(&self, name: &str) -> Result<Option<FlowSnapshot>> {
        let row = sqlx::query("SELECT snapshot FROM flows WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let snapshot_json: String = row.get("snapshot");
                let snapshot: FlowSnapshot = serde_json::from_str(&snapshot_json)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// List saved flows, most recently updated first
    pub async fn list_flows(&self) -> Result<Vec<FlowMetadata>> {
        let rows = sqlx::query(
            "SELECT name, created_at, updated_at FROM flows ORDER BY updated_at DESC, name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut flows = Vec::new();
        for row in rows {
            flows.push(FlowMetadata {
                name: row.get("name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(flows)
    }

    /// Delete a snapshot by name
    pub async fn delete_flow(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flows WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Basic flow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct FlowMetadata {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}
