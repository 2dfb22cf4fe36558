/// agentflow: dependency-ordered agent workflow execution
///
/// Runs workflows (graphs of agent-bound nodes) sequentially or level-parallel, with
/// cycle detection, cooperative pause/resume/cancel and per-node error detail.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by the engine and its adapters
pub mod error;

// Workflow definitions, SQLite storage and the hot-reload registry
pub mod workflow;

// Execution records and their repositories
pub mod execution;

// Agent invoker and agent memory collaborators
pub mod agent;

// Lifecycle events and sinks
pub mod events;

// SQLite bootstrap shared by the storage adapters
pub mod database;

// Runtime execution engine - graph ordering, drivers and run control
pub mod runtime;

// Re-export commonly used types for external consumers
pub use agent::{AgentInvoker, AgentMemory, EchoInvoker, InMemoryAgentMemory};
pub use database::EngineDatabase;
pub use error::{OrchestratorError, Result};
pub use events::{BroadcastEventSink, EventSink, ExecutionEvent, NoopEventSink, TracingEventSink};
pub use execution::{
    Execution, ExecutionRepository, ExecutionStatus, InMemoryExecutionStore, NodeError,
    NodeResult, SqliteExecutionStore,
};
pub use runtime::{ExecutionEngine, NodeExecutor};
pub use workflow::{Edge, ExecutionMode, Node, Workflow, WorkflowConfig, WorkflowRegistry};
