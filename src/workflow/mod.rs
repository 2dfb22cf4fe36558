/// Workflow definitions and where they live
///
/// - Type definitions (Workflow, Node, Edge, WorkflowConfig)
/// - SQLite persistence with sqlx
/// - Lock-free hot-reload registry using ArcSwap
/// - The repository trait the engine loads definitions through

pub mod types;

pub mod storage;

pub mod registry;

pub mod repository;

pub use registry::WorkflowRegistry;
pub use repository::WorkflowRepository;
pub use storage::{WorkflowStorage, WorkflowSummary};
pub use types::{Edge, ExecutionMode, Node, Workflow, WorkflowConfig, DEFAULT_OUTPUT_CHANNEL};
