/// Runtime Execution Engine
///
/// This module turns a workflow definition into a finished execution:
/// - Graph validation and deterministic topological ordering (petgraph)
/// - Longest-path leveling for parallel execution
/// - Per-node execution with input gathering and agent memory
/// - The run coordinator with pause/resume/cancel control

// Graph validator and topological sorter
pub mod graph;

// Level planner for the parallel driver
pub mod levels;

// Live run state shared between the coordinator and control requests
pub mod control;

// Individual node execution
pub mod executor;

// Run lifecycle coordinator
pub mod engine;

pub use control::{ControlAction, RunHandle};
pub use engine::{ExecutionEngine, INTERRUPTED_MESSAGE};
pub use executor::NodeExecutor;
pub use graph::{topological_order, WorkflowGraph};
pub use levels::compute_levels;
