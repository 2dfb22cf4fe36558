/// Execution repository seam and the in-memory adapter

use crate::execution::types::Execution;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable store for execution snapshots keyed by execution id
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Insert or replace the snapshot for `execution.id`
    async fn save(&self, execution: &Execution) -> Result<()>;

    async fn load(&self, execution_id: &str) -> Result<Option<Execution>>;

    /// All executions of a workflow, newest first
    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>>;

    /// Executions whose last snapshot is still running or paused
    async fn list_unfinished(&self) -> Result<Vec<Execution>>;
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<String, Execution>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionStore {
    async fn save(&self, execution: &Execution) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn load(&self, execution_id: &str) -> Result<Option<Execution>> {
        Ok(self.executions.read().await.get(execution_id).cloned())
    }

    async fn list_for_workflow(&self, workflow_id: &str) -> Result<Vec<Execution>> {
        let mut found: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|execution| execution.workflow_id == workflow_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(found)
    }

    async fn list_unfinished(&self) -> Result<Vec<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .values()
            .filter(|execution| !execution.is_terminal())
            .cloned()
            .collect())
    }
}
