/// Execution coordinator
///
/// Owns the lifecycle of every run: loads the workflow, validates and orders the
/// graph, drives nodes sequentially or level by level, accumulates results and
/// errors, settles the terminal status, persists snapshots and emits lifecycle events.

use crate::error::{OrchestratorError, Result};
use crate::events::{EventSink, ExecutionEvent};
use crate::execution::{Execution, ExecutionRepository, ExecutionStatus};
use crate::runtime::control::{ControlAction, RunHandle};
use crate::runtime::executor::NodeExecutor;
use crate::runtime::graph::topological_order;
use crate::runtime::levels::compute_levels;
use crate::workflow::{ExecutionMode, Node, WorkflowRepository};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Message stored on executions abandoned by a previous process
pub const INTERRUPTED_MESSAGE: &str = "interrupted by process restart";

pub struct ExecutionEngine {
    workflows: Arc<dyn WorkflowRepository>,
    runs: RunCoordinator,
}

/// Everything a run needs once it has been handed to its own task
#[derive(Clone)]
struct RunCoordinator {
    executions: Arc<dyn ExecutionRepository>,
    executor: Arc<NodeExecutor>,
    events: Arc<dyn EventSink>,
    /// Runs currently in flight, keyed by execution id
    active: Arc<RwLock<HashMap<String, Arc<RunHandle>>>>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("executor", &self.runs.executor)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        executions: Arc<dyn ExecutionRepository>,
        executor: Arc<NodeExecutor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            workflows,
            runs: RunCoordinator {
                executions,
                executor,
                events,
                active: Arc::new(RwLock::new(HashMap::new())),
            },
        }
    }

    /// Run a workflow to a terminal state
    ///
    /// Expected failure modes (cycles, dangling edges, node failures, cancellation)
    /// come back as an `Execution` with the matching status. Only an unknown workflow
    /// id or a repository failure while loading is returned as `Err`.
    ///
    /// The run lives on its own task. Dropping the returned future detaches the caller
    /// but the run still settles, persists and deregisters.
    pub async fn submit_run(&self, workflow_id: &str, context: Value) -> Result<Execution> {
        let workflow = self
            .workflows
            .load(workflow_id)
            .await?
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

        let execution = Execution::new(workflow_id, context);
        let execution_id = execution.id.clone();
        let run = Arc::new(RunHandle::new(execution, workflow));

        let runs = self.runs.clone();
        let task_run = Arc::clone(&run);
        match tokio::spawn(async move { runs.execute(task_run).await }).await {
            Ok(finished) => Ok(finished),
            Err(join_error) => {
                let message = format!("run task did not complete: {}", join_error);
                tracing::error!("💥 Execution {} aborted: {}", execution_id, message);
                let failed = run.seal(ExecutionStatus::Failed, Some(message)).await;
                self.runs.persist(&run).await;
                self.runs.active.write().await.remove(&execution_id);
                Ok(failed)
            }
        }
    }

    pub async fn pause_run(&self, execution_id: &str) -> Result<Execution> {
        self.control(execution_id, ControlAction::Pause).await
    }

    pub async fn resume_run(&self, execution_id: &str) -> Result<Execution> {
        self.control(execution_id, ControlAction::Resume).await
    }

    pub async fn cancel_run(&self, execution_id: &str) -> Result<Execution> {
        self.control(execution_id, ControlAction::Cancel).await
    }

    /// Apply a control action to a live run; finished runs are returned unchanged
    async fn control(&self, execution_id: &str, action: ControlAction) -> Result<Execution> {
        match self.runs.live(execution_id).await {
            Some(run) => {
                let (execution, changed) = run.request(action).await;
                if changed {
                    self.runs.persist(&run).await;
                }
                Ok(execution)
            }
            None => self.stored(execution_id).await,
        }
    }

    async fn stored(&self, execution_id: &str) -> Result<Execution> {
        self.runs
            .executions
            .load(execution_id)
            .await?
            .ok_or_else(|| OrchestratorError::ExecutionNotFound(execution_id.to_string()))
    }

    /// Current view of an execution, live or stored
    pub async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        match self.runs.live(execution_id).await {
            Some(run) => Ok(run.snapshot().await),
            None => self.stored(execution_id).await,
        }
    }

    /// Executions of a workflow, newest first, with live runs taking precedence
    pub async fn list_executions(&self, workflow_id: &str) -> Result<Vec<Execution>> {
        let mut by_id: HashMap<String, Execution> = self
            .runs
            .executions
            .list_for_workflow(workflow_id)
            .await?
            .into_iter()
            .map(|execution| (execution.id.clone(), execution))
            .collect();

        let live: Vec<Arc<RunHandle>> = self
            .runs
            .active
            .read()
            .await
            .values()
            .filter(|run| run.workflow().id == workflow_id)
            .cloned()
            .collect();
        for run in live {
            let snapshot = run.snapshot().await;
            by_id.insert(snapshot.id.clone(), snapshot);
        }

        let mut executions: Vec<Execution> = by_id.into_values().collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        Ok(executions)
    }

    /// Fail stored executions left running or paused by a previous process
    ///
    /// Assumes this process is the only one driving runs against the store.
    pub async fn recover_interrupted(&self) -> Result<Vec<Execution>> {
        let mut recovered = Vec::new();

        for mut execution in self.runs.executions.list_unfinished().await? {
            if self.runs.live(&execution.id).await.is_some() {
                continue;
            }

            tracing::warn!("♻️ Marking interrupted execution {} ({}) as failed",
                execution.id, execution.status);
            execution.error = Some(INTERRUPTED_MESSAGE.to_string());
            execution.finish(ExecutionStatus::Failed);
            self.runs.executions.save(&execution).await?;
            recovered.push(execution);
        }

        Ok(recovered)
    }

    /// Number of runs currently in flight
    pub async fn active_runs(&self) -> usize {
        self.runs.active.read().await.len()
    }
}

impl RunCoordinator {
    async fn live(&self, execution_id: &str) -> Option<Arc<RunHandle>> {
        self.active.read().await.get(execution_id).cloned()
    }

    /// Whole lifecycle of one run, from registration to deregistration
    async fn execute(&self, run: Arc<RunHandle>) -> Execution {
        let execution_id = run.execution_id().to_string();
        let mode = run.workflow().config.execution_mode;

        tracing::info!("🚀 Starting execution {} of workflow '{}' ({:?}, {} nodes)",
            execution_id, run.workflow().id, mode, run.workflow().nodes.len());

        self.active
            .write()
            .await
            .insert(execution_id.clone(), Arc::clone(&run));

        self.persist(&run).await;
        self.events.emit(ExecutionEvent::ExecutionStarted {
            execution: run.snapshot().await,
        });

        let outcome = self.drive(&run, mode).await;
        let finished = self.settle(&run, outcome).await;

        self.persist(&run).await;
        self.active.write().await.remove(&execution_id);
        self.events.emit(ExecutionEvent::ExecutionCompleted {
            execution: finished.clone(),
        });

        tracing::info!("🏁 Execution {} finished as {} in {}ms",
            execution_id, finished.status, finished.duration_ms.unwrap_or_default());

        finished
    }

    async fn drive(&self, run: &Arc<RunHandle>, mode: ExecutionMode) -> Result<()> {
        let sorted = topological_order(run.workflow())?;
        tracing::debug!("📋 Execution order: {:?}",
            sorted.iter().map(|node| node.id.as_str()).collect::<Vec<_>>());

        match mode {
            ExecutionMode::Sequential => self.run_sequential(run, &sorted).await,
            ExecutionMode::Parallel => self.run_parallel(run, &sorted).await,
        }
    }

    /// Map the driver outcome onto a terminal status and seal the run
    async fn settle(&self, run: &RunHandle, outcome: Result<()>) -> Execution {
        match outcome {
            // A cancel that raced the final node still ends the run as cancelled
            Ok(()) if run.status() == ExecutionStatus::Cancelled => {
                run.seal(ExecutionStatus::Cancelled, None).await
            }
            Ok(()) => run.seal(ExecutionStatus::Completed, None).await,
            Err(OrchestratorError::Cancelled) => run.seal(ExecutionStatus::Cancelled, None).await,
            Err(err) => {
                let message = err.to_string();
                tracing::error!("❌ Execution {} failed: {}", run.execution_id(), message);
                let failed = run.seal(ExecutionStatus::Failed, Some(message.clone())).await;
                self.events.emit(ExecutionEvent::ExecutionFailed {
                    execution: failed.clone(),
                    error: message,
                });
                failed
            }
        }
    }

    /// One node at a time, checking for pause/cancel before each
    async fn run_sequential(&self, run: &Arc<RunHandle>, sorted: &[Node]) -> Result<()> {
        for (step, node) in sorted.iter().enumerate() {
            run.checkpoint().await?;

            tracing::info!("📍 Step {}/{}: executing node '{}'", step + 1, sorted.len(), node.id);

            let result = self.executor.execute_node(node, run).await?;
            if run.record_result(result.clone()).await {
                self.events.emit(ExecutionEvent::NodeCompleted {
                    execution_id: run.execution_id().to_string(),
                    node_id: node.id.clone(),
                    result,
                });
            }
            self.persist(run).await;
        }

        Ok(())
    }

    /// Level by level; every node of a level runs as its own task behind a barrier
    ///
    /// The first failure in a level aborts the run at once. Siblings already in flight
    /// are left to finish on their own and anything they produce after the run is
    /// sealed is discarded.
    async fn run_parallel(&self, run: &Arc<RunHandle>, sorted: &[Node]) -> Result<()> {
        let levels = compute_levels(sorted, run.workflow());

        for (depth, level) in levels.into_iter().enumerate() {
            run.checkpoint().await?;

            tracing::info!("🔀 Level {}: executing {} nodes concurrently", depth, level.len());

            let mut pending = FuturesUnordered::new();
            for node in level {
                let node_id = node.id.clone();
                let executor = Arc::clone(&self.executor);
                let events = Arc::clone(&self.events);
                let task_run = Arc::clone(run);

                let handle = tokio::spawn(async move {
                    let result = executor.execute_node(&node, &task_run).await?;
                    if task_run.record_result(result.clone()).await {
                        events.emit(ExecutionEvent::NodeCompleted {
                            execution_id: task_run.execution_id().to_string(),
                            node_id: node.id.clone(),
                            result,
                        });
                    }
                    Ok::<(), OrchestratorError>(())
                });

                pending.push(async move { (node_id, handle.await) });
            }

            while let Some((node_id, joined)) = pending.next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if !pending.is_empty() {
                            tracing::warn!("⚠️ Level {} aborted by '{}'; {} sibling(s) left running",
                                depth, node_id, pending.len());
                        }
                        return Err(err);
                    }
                    Err(join_error) => {
                        let cause = format!("node task did not complete: {}", join_error);
                        run.record_error(&node_id, &cause).await;
                        return Err(OrchestratorError::NodeExecution { node_id, cause });
                    }
                }
            }

            self.persist(run).await;
        }

        Ok(())
    }

    /// Snapshot persistence; failures are logged and the run carries on
    async fn persist(&self, run: &RunHandle) {
        let _guard = run.persist_guard().await;
        let snapshot = run.snapshot().await;
        if let Err(e) = self.executions.save(&snapshot).await {
            tracing::error!("💥 Failed to persist execution {}: {:#}", snapshot.id, e);
        }
    }
}
