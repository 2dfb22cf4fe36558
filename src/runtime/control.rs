/// Live state of one running execution
///
/// The coordinator and its node tasks write results and errors here; pause, resume
/// and cancel requests flip the status. Status changes are mirrored into a watch
/// channel so a driver suspended at a node boundary wakes as soon as the run is
/// resumed or cancelled.

use crate::error::{OrchestratorError, Result};
use crate::execution::{Execution, ExecutionStatus, NodeResult};
use crate::workflow::Workflow;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard, RwLock};

/// Externally requested state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
}

impl ControlAction {
    /// Status reached by applying this action to `current`, if the move is legal
    fn apply(self, current: ExecutionStatus) -> Option<ExecutionStatus> {
        match (self, current) {
            (ControlAction::Pause, ExecutionStatus::Running) => Some(ExecutionStatus::Paused),
            (ControlAction::Resume, ExecutionStatus::Paused) => Some(ExecutionStatus::Running),
            (ControlAction::Cancel, ExecutionStatus::Running | ExecutionStatus::Paused) => {
                Some(ExecutionStatus::Cancelled)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
struct RunState {
    execution: Execution,
    /// Set once the coordinator has written the terminal status; later writes are dropped
    sealed: bool,
}

#[derive(Debug)]
pub struct RunHandle {
    execution_id: String,
    workflow: Arc<Workflow>,
    context: Value,
    state: RwLock<RunState>,
    status: watch::Sender<ExecutionStatus>,
    /// Serializes snapshot writes so an older snapshot never lands after a newer one
    persist_lock: Mutex<()>,
}

impl RunHandle {
    pub fn new(execution: Execution, workflow: Arc<Workflow>) -> Self {
        let (status, _) = watch::channel(execution.status);
        Self {
            execution_id: execution.id.clone(),
            context: execution.context.clone(),
            workflow,
            state: RwLock::new(RunState {
                execution,
                sealed: false,
            }),
            status,
            persist_lock: Mutex::new(()),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// The run's initial input
    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.status.borrow()
    }

    /// Copy of the current record
    pub async fn snapshot(&self) -> Execution {
        self.state.read().await.execution.clone()
    }

    /// Run `f` against the current record under the read lock
    pub async fn read<R>(&self, f: impl FnOnce(&Execution) -> R) -> R {
        f(&self.state.read().await.execution)
    }

    /// Node boundary: suspend while paused, fail with `Cancelled` once cancelled
    pub async fn checkpoint(&self) -> Result<()> {
        let mut rx = self.status.subscribe();
        if *rx.borrow() == ExecutionStatus::Paused {
            tracing::info!("⏸️ Execution {} paused, waiting for resume", self.execution_id);
        }

        let status = *rx
            .wait_for(|status| *status != ExecutionStatus::Paused)
            .await
            .map_err(|_| OrchestratorError::Cancelled)?;

        if status == ExecutionStatus::Cancelled {
            tracing::warn!("🛑 Execution {} cancelled, not starting further nodes", self.execution_id);
            return Err(OrchestratorError::Cancelled);
        }

        Ok(())
    }

    /// Apply a control request; returns the updated record and whether it changed
    pub async fn request(&self, action: ControlAction) -> (Execution, bool) {
        let mut state = self.state.write().await;
        if state.sealed {
            return (state.execution.clone(), false);
        }

        let Some(next) = action.apply(state.execution.status) else {
            return (state.execution.clone(), false);
        };

        state.execution.status = next;
        if next == ExecutionStatus::Cancelled {
            state.execution.completed_at = Some(Utc::now());
        }
        self.status.send_replace(next);

        tracing::info!("🎛️ Execution {} -> {} ({:?})", self.execution_id, next, action);

        (state.execution.clone(), true)
    }

    /// Store a node result; `false` when the run was already sealed
    pub async fn record_result(&self, result: NodeResult) -> bool {
        let mut state = self.state.write().await;
        if state.sealed {
            tracing::debug!("🔕 Dropping late result of node '{}' for sealed execution {}",
                result.node_id, self.execution_id);
            return false;
        }
        state.execution.results.insert(result.node_id.clone(), result);
        true
    }

    /// Append a node failure; `false` when the run was already sealed
    pub async fn record_error(&self, node_id: &str, error: &str) -> bool {
        let mut state = self.state.write().await;
        if state.sealed {
            return false;
        }
        state.execution.record_error(node_id, error);
        true
    }

    /// Write the terminal status and freeze the record
    pub async fn seal(&self, status: ExecutionStatus, error: Option<String>) -> Execution {
        let mut state = self.state.write().await;
        state.sealed = true;
        if error.is_some() {
            state.execution.error = error;
        }
        state.execution.finish(status);
        self.status.send_replace(status);
        state.execution.clone()
    }

    pub async fn persist_guard(&self) -> MutexGuard<'_, ()> {
        self.persist_lock.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn handle() -> RunHandle {
        let workflow = Workflow {
            id: "wf".to_string(),
            name: "wf".to_string(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            config: Default::default(),
        };
        RunHandle::new(Execution::new("wf", json!({ "seed": 1 })), Arc::new(workflow))
    }

    #[tokio::test]
    async fn control_transitions_are_idempotent() {
        let run = handle();

        let (paused, changed) = run.request(ControlAction::Pause).await;
        assert!(changed);
        assert_eq!(paused.status, ExecutionStatus::Paused);

        let (_, changed) = run.request(ControlAction::Pause).await;
        assert!(!changed);

        let (resumed, _) = run.request(ControlAction::Resume).await;
        assert_eq!(resumed.status, ExecutionStatus::Running);

        let (_, changed) = run.request(ControlAction::Resume).await;
        assert!(!changed);
    }

    #[tokio::test]
    async fn cancel_stamps_completion_and_blocks_further_changes() {
        let run = handle();
        let (cancelled, _) = run.request(ControlAction::Cancel).await;
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        let (after, changed) = run.request(ControlAction::Resume).await;
        assert!(!changed);
        assert_eq!(after.status, ExecutionStatus::Cancelled);
        assert!(matches!(run.checkpoint().await, Err(OrchestratorError::Cancelled)));
    }

    #[tokio::test]
    async fn checkpoint_waits_until_resumed() {
        let run = Arc::new(handle());
        run.request(ControlAction::Pause).await;

        let waiter = {
            let run = Arc::clone(&run);
            tokio::spawn(async move { run.checkpoint().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        run.request(ControlAction::Resume).await;
        let outcome = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("checkpoint should wake on resume")
            .unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn sealed_runs_ignore_late_writes() {
        let run = handle();
        let sealed = run.seal(ExecutionStatus::Failed, Some("boom".to_string())).await;
        assert_eq!(sealed.error.as_deref(), Some("boom"));

        assert!(!run.record_error("late", "too late").await);
        let (after, changed) = run.request(ControlAction::Cancel).await;
        assert!(!changed);
        assert_eq!(after.status, ExecutionStatus::Failed);
        assert!(after.errors.is_empty());
    }
}
