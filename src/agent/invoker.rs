/// Agent invocation seam
///
/// The engine never knows what an agent does; it hands the resolved inputs and the
/// agent's prior memory to an invoker and records whatever comes back.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Performs the actual work a node represents
///
/// Calls may be slow. Timeouts and retries are the invoker's business; the engine
/// treats any `Err` as fatal to the run.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, agent_id: &str, input: &Value, memory: &Value) -> Result<Value>;
}

/// Placeholder invoker that reports what it was given
///
/// Useful as the binary's default and for smoke-testing workflow wiring.
#[derive(Debug, Default, Clone)]
pub struct EchoInvoker;

#[async_trait]
impl AgentInvoker for EchoInvoker {
    async fn invoke(&self, agent_id: &str, input: &Value, memory: &Value) -> Result<Value> {
        Ok(json!({
            "status": "success",
            "data": format!("Agent {} processed: {}", agent_id, input),
            "memory": memory,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        }))
    }
}
