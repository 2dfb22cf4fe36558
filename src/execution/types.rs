/// Execution records: one mutable run of a workflow
///
/// The coordinator is the only writer while a run is live. Once the status is
/// terminal the record is frozen and only ever read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Run-level state machine
///
/// `Running ⇄ Paused`, then exactly one of the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Cancelled | ExecutionStatus::Completed | ExecutionStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one successful node execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub node_id: String,
    pub agent_id: String,
    /// Inputs as resolved from upstream edges (or the run context)
    pub input: Value,
    /// Whatever the agent invoker returned
    pub output: Value,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// A node failure recorded against the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeError {
    pub node_id: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// One run instance of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    /// Initial input for the run, never modified
    pub context: Value,
    pub status: ExecutionStatus,
    /// Append-only map of node id to its result
    #[serde(default)]
    pub results: BTreeMap<String, NodeResult>,
    /// Node failures in the order they were observed
    #[serde(default)]
    pub errors: Vec<NodeError>,
    /// Top-level reason the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl Execution {
    /// Fresh execution in `Running` with a generated `exec_` id
    pub fn new(workflow_id: impl Into<String>, context: Value) -> Self {
        Self {
            id: format!("exec_{}", uuid::Uuid::new_v4().simple()),
            workflow_id: workflow_id.into(),
            context,
            status: ExecutionStatus::Running,
            results: BTreeMap::new(),
            errors: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Move into a terminal state and stamp completion time and duration
    ///
    /// A `completed_at` already stamped by a cancel request is kept.
    pub fn finish(&mut self, status: ExecutionStatus) {
        debug_assert!(status.is_terminal());
        let completed_at = *self.completed_at.get_or_insert_with(Utc::now);
        self.status = status;
        self.duration_ms = Some((completed_at - self.started_at).num_milliseconds());
    }

    /// Record a node failure
    pub fn record_error(&mut self, node_id: impl Into<String>, error: impl Into<String>) {
        self.errors.push(NodeError {
            node_id: node_id.into(),
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
