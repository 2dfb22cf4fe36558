/// SQLite persistence for execution snapshots
///
/// The full record is kept as JSON; `workflow_id`, `status` and `started_at` are
/// mirrored into columns so history and recovery queries stay indexed.

use crate::execution::{repository::ExecutionRepository, types::Execution};
use anyhow::Result;
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{sqlite::SqlitePool, Row};

#[derive(Debug, Clone)]
pub struct SqliteExecutionStore {
    pool: SqlitePool,
}

impl SqliteExecutionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the executions table and its lookup indexes
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                record JSON NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_executions_workflow ON executions(workflow_id, started_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_status ON executions(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn decode_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Execution>> {
        rows.into_iter()
            .map(|row| -> Result<Execution> {
                let record: String = row.get("record");
                Ok(serde_json::from_str(&record)?)
            })
            .collect()
    }
}

#[async_trait]
impl ExecutionRepository for SqliteExecutionStore {
    async fn save(&self, execution: &Execution) -> Result<()> {
        let record = serde_json::to_string(execution)?;
        // Fixed-width UTC timestamps sort correctly as text
        let started_at = execution
            .started_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO executions (id, workflow_id, status, started_at, record, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                record = excluded.record,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&execution.id)
        .bind(&execution.workflow_id)
        .bind(execution.status.as_str())
        .bind(&started_at)
        .bind(&record)
        .execute(&self.pool)
        .await?;

        tracing::debug!("💾 Persisted execution {} ({})", execution.id, execution.status);

        Ok(())
    }

    async fn load(&self, execution_id: &str) -> Result<Option<Execution>> {
        let row = sqlx::query("SELECT record FROM executions WHERE id = ?")
            .bind(execution_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let record: String = row.get("record");
                Ok(Some(serde_json::from_str(&record)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>> {
        let rows = sqlx::query(
            "SELECT record FROM executions WHERE workflow_id = ? ORDER BY started_at DESC",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Self::decode_rows(rows)
    }

    async fn list_unfinished(&self) -> Result<Vec<Execution>> {
        let rows = sqlx::query(
            "SELECT record FROM executions WHERE status IN ('running', 'paused') ORDER BY started_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Self::decode_rows(rows)
    }
}
