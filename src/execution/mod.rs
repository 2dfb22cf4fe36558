/// Execution records and their persistence
///
/// - `Execution`, `NodeResult`, `NodeError` and the status state machine
/// - `ExecutionRepository` trait with in-memory and SQLite adapters

pub mod types;

pub mod repository;

pub mod storage;

pub use repository::{ExecutionRepository, InMemoryExecutionStore};
pub use storage::SqliteExecutionStore;
pub use types::{Execution, ExecutionStatus, NodeError, NodeResult};
