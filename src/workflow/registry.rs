/// Hot-reload workflow registry using ArcSwap
///
/// Runs read workflow definitions from here without locking. Every update swaps the
/// whole map, so a run that already holds an `Arc<Workflow>` keeps its snapshot even if
/// the definition is replaced mid-run.

use crate::workflow::{storage::WorkflowStorage, types::Workflow};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Key: workflow_id, Value: immutable definition shared with running executions
    workflows: ArcSwap<HashMap<String, Arc<Workflow>>>,

    /// Backing store; `None` for purely in-memory registries
    storage: Option<WorkflowStorage>,
}

impl WorkflowRegistry {
    /// Create a registry backed by SQLite storage
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage: Some(storage),
        }
    }

    /// Create a registry with no persistence
    pub fn in_memory() -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage: None,
        }
    }

    /// Populate the registry from storage, replacing whatever was cached
    pub async fn init_from_storage(&self) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let stored = storage.load_all_workflows().await?;
        let loaded: HashMap<String, Arc<Workflow>> = stored
            .into_iter()
            .map(|(id, workflow)| (id, Arc::new(workflow)))
            .collect();

        self.workflows.store(Arc::new(loaded));

        tracing::info!("📥 Initialized workflow registry with {} workflows",
            self.workflows.load().len());

        Ok(())
    }

    /// Persist a workflow (when backed by storage) and swap it into the registry
    pub async fn register(&self, workflow: Workflow) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.save_workflow(&workflow).await?;
        }
        self.insert(workflow);
        Ok(())
    }

    /// Swap a workflow into the in-memory map without touching storage
    pub fn insert(&self, workflow: Workflow) {
        let workflow_id = workflow.id.clone();
        let workflow = Arc::new(workflow);
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(workflow_id.clone(), Arc::clone(&workflow));
            next
        });

        tracing::info!("🔥 Hot-reloaded workflow: {}", workflow_id);
    }

    /// Re-read a single workflow from storage
    pub async fn reload_workflow(&self, workflow_id: &str) -> Result<()> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Registry has no backing storage"))?;

        let workflow = storage
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;

        self.insert(workflow);
        Ok(())
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get_workflow(&self, workflow_id: &str) -> Option<Arc<Workflow>> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// List all active workflow IDs, sorted for stable output
    pub fn list_workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove a workflow from the registry and its storage
    pub async fn remove_workflow(&self, workflow_id: &str) -> Result<bool> {
        if let Some(storage) = &self.storage {
            storage.delete_workflow(workflow_id).await?;
        }

        let mut removed = false;
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(workflow_id).is_some();
            next
        });

        if removed {
            tracing::info!("🗑️ Removed workflow from registry: {}", workflow_id);
        }

        Ok(removed)
    }
}
