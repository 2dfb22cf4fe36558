//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use agentflow::{
    AgentInvoker, BroadcastEventSink, Edge, ExecutionEngine, ExecutionEvent, ExecutionMode,
    InMemoryAgentMemory, InMemoryExecutionStore, Node, NodeExecutor, Workflow, WorkflowConfig,
    WorkflowRegistry,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};

/// Fluent builder for test workflows; node `x` is bound to agent `agent-x`
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            workflow: Workflow {
                id: id.to_string(),
                name: format!("Test workflow: {}", id),
                description: None,
                nodes: Vec::new(),
                edges: Vec::new(),
                config: WorkflowConfig::default(),
            },
        }
    }

    pub fn node(mut self, id: &str) -> Self {
        self.workflow.nodes.push(Node::new(id, agent(id)));
        self
    }

    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.workflow.edges.push(Edge::new(source, target));
        self
    }

    pub fn labelled_edge(mut self, source: &str, target: &str, label: &str) -> Self {
        self.workflow.edges.push(Edge::labelled(source, target, label));
        self
    }

    pub fn parallel(mut self) -> Self {
        self.workflow.config.execution_mode = ExecutionMode::Parallel;
        self
    }

    pub fn build(self) -> Workflow {
        self.workflow
    }
}

pub fn agent(node_id: &str) -> String {
    format!("agent-{}", node_id)
}

/// Holds an agent call open until the test releases it
pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

impl Gate {
    /// Resolves once the gated agent has been invoked
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

/// Deterministic invoker: echoes its agent id and input, with optional failures,
/// delays and gates per agent
#[derive(Default)]
pub struct ScriptedInvoker {
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    gates: HashMap<String, Arc<Gate>>,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, node_id: &str, message: &str) -> Self {
        self.failures.insert(agent(node_id), message.to_string());
        self
    }

    pub fn delayed(mut self, node_id: &str, delay: Duration) -> Self {
        self.delays.insert(agent(node_id), delay);
        self
    }

    pub fn gated(mut self, node_id: &str) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        self.gates.insert(agent(node_id), Arc::clone(&gate));
        (self, gate)
    }

    /// Agents in the order their calls started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Agents whose calls ran to the end, failures excluded
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, agent_id: &str, input: &Value, _memory: &Value) -> anyhow::Result<Value> {
        self.started.lock().unwrap().push(agent_id.to_string());

        if let Some(gate) = self.gates.get(agent_id) {
            gate.entered.notify_one();
            gate.release.acquire().await?.forget();
        }
        if let Some(delay) = self.delays.get(agent_id) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(agent_id) {
            anyhow::bail!("{}", message);
        }

        self.finished.lock().unwrap().push(agent_id.to_string());
        Ok(json!({ "agent": agent_id, "seen": input }))
    }
}

/// Engine wired to in-memory collaborators
pub struct Harness {
    pub engine: Arc<ExecutionEngine>,
    pub events: Arc<BroadcastEventSink>,
    pub invoker: Arc<ScriptedInvoker>,
    pub registry: Arc<WorkflowRegistry>,
    pub executions: Arc<InMemoryExecutionStore>,
    pub memory: Arc<InMemoryAgentMemory>,
}

impl Harness {
    pub fn new(invoker: ScriptedInvoker) -> Self {
        let invoker = Arc::new(invoker);
        let events = Arc::new(BroadcastEventSink::new(1024));
        let registry = Arc::new(WorkflowRegistry::in_memory());
        let executions = Arc::new(InMemoryExecutionStore::new());
        let memory = Arc::new(InMemoryAgentMemory::default());

        let executor = Arc::new(NodeExecutor::new(invoker.clone(), memory.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            registry.clone(),
            executions.clone(),
            executor,
            events.clone(),
        ));

        Self {
            engine,
            events,
            invoker,
            registry,
            executions,
            memory,
        }
    }

    pub fn with_workflow(invoker: ScriptedInvoker, workflow: Workflow) -> Self {
        let harness = Self::new(invoker);
        harness.registry.insert(workflow);
        harness
    }
}

/// Wait for the next `execution:started` event and return its execution id
pub async fn started_execution_id(rx: &mut broadcast::Receiver<ExecutionEvent>) -> String {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for execution:started")
            .expect("event channel closed");
        if let ExecutionEvent::ExecutionStarted { execution } = event {
            return execution.id;
        }
    }
}

/// Wait for `node:completed` of `node_id`
pub async fn node_completed(rx: &mut broadcast::Receiver<ExecutionEvent>, node_id: &str) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for node:completed")
            .expect("event channel closed");
        if let ExecutionEvent::NodeCompleted { node_id: completed, .. } = &event {
            if completed == node_id {
                return;
            }
        }
    }
}

/// Everything currently buffered on the receiver
pub fn drain(rx: &mut broadcast::Receiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait for `execution:completed` and return the final record
pub async fn execution_completed(rx: &mut broadcast::Receiver<ExecutionEvent>) -> agentflow::Execution {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for execution:completed")
            .expect("event channel closed");
        if let ExecutionEvent::ExecutionCompleted { execution } = event {
            return execution;
        }
    }
}
