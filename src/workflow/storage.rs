/// SQLite persistence for workflow definitions
///
/// The definition is one JSON document per row. Name, execution mode and graph size are
/// copied into plain columns so listings never have to parse the document.

use crate::workflow::types::Workflow;
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

/// Listing row for a stored workflow
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub execution_mode: String,
    pub node_count: i64,
    pub edge_count: i64,
    pub updated_at: String,
}

impl WorkflowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the workflows table; idempotent
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                execution_mode TEXT NOT NULL,
                node_count INTEGER NOT NULL,
                edge_count INTEGER NOT NULL,
                definition JSON NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn decode(id: &str, definition: &str) -> Result<Workflow> {
        serde_json::from_str(definition)
            .with_context(|| format!("stored definition of workflow '{}' is corrupt", id))
    }

    /// Insert or replace a definition
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        let definition = serde_json::to_string(workflow)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, execution_mode, node_count, edge_count, definition, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                execution_mode = excluded.execution_mode,
                node_count = excluded.node_count,
                edge_count = excluded.edge_count,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(workflow.config.execution_mode.as_str())
        .bind(workflow.nodes.len() as i64)
        .bind(workflow.edges.len() as i64)
        .bind(&definition)
        .execute(&self.pool)
        .await?;

        tracing::debug!("💾 Saved workflow '{}' ({} nodes, {} edges)",
            workflow.id, workflow.nodes.len(), workflow.edges.len());

        Ok(())
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>> {
        let definition: Option<(String,)> =
            sqlx::query_as("SELECT definition FROM workflows WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        definition
            .map(|(definition,)| Self::decode(id, &definition))
            .transpose()
    }

    /// Summaries of every stored workflow, most recently updated first
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let summaries = sqlx::query_as::<_, WorkflowSummary>(
            r#"
            SELECT id, name, execution_mode, node_count, edge_count, CAST(updated_at AS TEXT) AS updated_at
            FROM workflows
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    /// Every definition keyed by id, for filling the registry
    pub async fn load_all_workflows(&self) -> Result<HashMap<String, Workflow>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, definition FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id, definition)| -> Result<(String, Workflow)> {
                let workflow = Self::decode(&id, &definition)?;
                Ok((id, workflow))
            })
            .collect()
    }

    /// `true` when a row was removed
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!("🗑️ Deleted workflow '{}'", id);
        }

        Ok(deleted > 0)
    }
}
