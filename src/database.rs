/// SQLite database bootstrap
///
/// One database file holds both the `workflows` and `executions` tables:
/// {data_dir}/agentflow.db

use crate::{execution::SqliteExecutionStore, workflow::WorkflowStorage};
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

/// File name of the engine database inside the data directory
pub const DATABASE_FILE: &str = "agentflow.db";

#[derive(Debug, Clone)]
pub struct EngineDatabase {
    pool: SqlitePool,
}

impl EngineDatabase {
    /// Open (creating if missing) the database under `data_dir` and apply schemas
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir.display(), e)
        })?;
        let db_path: PathBuf = data_dir.join(DATABASE_FILE);

        tracing::info!("🗄️ Opening engine database: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let database = Self { pool };
        database.init_schema().await?;

        tracing::info!("✅ Engine database ready: {}", db_path.display());

        Ok(database)
    }

    /// Private in-memory database, gone when the last handle drops
    pub async fn in_memory() -> Result<Self> {
        // Every sqlite::memory: connection is its own database, so pin the pool to one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.init_schema().await?;
        Ok(database)
    }

    async fn init_schema(&self) -> Result<()> {
        self.workflow_storage().init_schema().await?;
        self.execution_store().init_schema().await?;
        Ok(())
    }

    pub fn workflow_storage(&self) -> WorkflowStorage {
        WorkflowStorage::new(self.pool.clone())
    }

    pub fn execution_store(&self) -> SqliteExecutionStore {
        SqliteExecutionStore::new(self.pool.clone())
    }
}
