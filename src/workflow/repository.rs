/// Read-side seam the coordinator uses to fetch workflow definitions

use crate::workflow::{registry::WorkflowRegistry, storage::WorkflowStorage, types::Workflow};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable store of immutable workflow definitions keyed by id
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Load a workflow, `Ok(None)` when the id is unknown
    async fn load(&self, workflow_id: &str) -> Result<Option<Arc<Workflow>>>;
}

#[async_trait]
impl WorkflowRepository for WorkflowRegistry {
    async fn load(&self, workflow_id: &str) -> Result<Option<Arc<Workflow>>> {
        Ok(self.get_workflow(workflow_id))
    }
}

#[async_trait]
impl WorkflowRepository for WorkflowStorage {
    async fn load(&self, workflow_id: &str) -> Result<Option<Arc<Workflow>>> {
        Ok(self.get_workflow(workflow_id).await?.map(Arc::new))
    }
}
