/// Error taxonomy for the orchestration core
///
/// Structural problems (unknown ids, cycles, dangling edges) and per-node failures
/// are distinct variants so the coordinator can map each one onto the right
/// terminal state. Storage adapters keep using `anyhow` and are wrapped here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Circular dependency detected at node '{node_id}'")]
    Cycle { node_id: String },

    #[error("Invalid workflow graph: {message}")]
    InvalidGraph { message: String },

    #[error("Node '{node_id}' failed: {cause}")]
    NodeExecution { node_id: String, cause: String },

    /// Raised by a driver that observed a cancellation request.
    #[error("Execution cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl OrchestratorError {
    /// Errors that mean the caller handed us an id we have never seen.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            OrchestratorError::WorkflowNotFound(_) | OrchestratorError::ExecutionNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
