/// Lifecycle events emitted by the coordinator
///
/// Sinks are injected into the engine. Emitting is synchronous and must never block
/// on subscriber behavior.

use crate::execution::{Execution, NodeResult};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum ExecutionEvent {
    #[serde(rename = "execution:started")]
    ExecutionStarted { execution: Execution },

    #[serde(rename = "node:completed", rename_all = "camelCase")]
    NodeCompleted {
        execution_id: String,
        node_id: String,
        result: NodeResult,
    },

    #[serde(rename = "execution:failed")]
    ExecutionFailed { execution: Execution, error: String },

    /// Terminal announcement, sent for every run whatever its final status
    #[serde(rename = "execution:completed")]
    ExecutionCompleted { execution: Execution },
}

impl ExecutionEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ExecutionEvent::ExecutionStarted { .. } => "execution:started",
            ExecutionEvent::NodeCompleted { .. } => "node:completed",
            ExecutionEvent::ExecutionFailed { .. } => "execution:failed",
            ExecutionEvent::ExecutionCompleted { .. } => "execution:completed",
        }
    }

    pub fn execution_id(&self) -> &str {
        match self {
            ExecutionEvent::ExecutionStarted { execution }
            | ExecutionEvent::ExecutionFailed { execution, .. }
            | ExecutionEvent::ExecutionCompleted { execution } => &execution.id,
            ExecutionEvent::NodeCompleted { execution_id, .. } => execution_id,
        }
    }
}

/// Append-only observer of lifecycle events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

/// Fan-out sink backed by a tokio broadcast channel
///
/// Slow subscribers lag and lose events instead of stalling the engine.
#[derive(Debug)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<ExecutionEvent>,
}

impl BroadcastEventSink {
    /// `capacity` is raised to 1 when zero; broadcast channels need room for one event
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: ExecutionEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }
}

/// Writes each event as a structured log line
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ExecutionEvent) {
        match &event {
            ExecutionEvent::ExecutionStarted { execution } => {
                tracing::info!(execution_id = %execution.id, workflow_id = %execution.workflow_id,
                    "📣 {}", event.event_name());
            }
            ExecutionEvent::NodeCompleted { execution_id, node_id, result } => {
                tracing::info!(%execution_id, %node_id, duration_ms = result.duration_ms,
                    "📣 {}", event.event_name());
            }
            ExecutionEvent::ExecutionFailed { execution, error } => {
                tracing::warn!(execution_id = %execution.id, %error, "📣 {}", event.event_name());
            }
            ExecutionEvent::ExecutionCompleted { execution } => {
                tracing::info!(execution_id = %execution.id, status = %execution.status,
                    "📣 {}", event.event_name());
            }
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: ExecutionEvent) {}
}
