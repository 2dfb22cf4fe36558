/// Node execution: input gathering, agent invocation and memory update
///
/// A node's inputs are the outputs of its upstream nodes keyed by each edge's output
/// channel. Source nodes (nothing gathered) receive the run's original context instead.

use crate::agent::{AgentInvoker, AgentMemory};
use crate::error::{OrchestratorError, Result};
use crate::execution::{Execution, NodeResult};
use crate::runtime::control::RunHandle;
use crate::workflow::{Node, Workflow};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Executes single nodes against the agent collaborators
pub struct NodeExecutor {
    invoker: Arc<dyn AgentInvoker>,
    memory: Arc<dyn AgentMemory>,
}

impl std::fmt::Debug for NodeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeExecutor").finish_non_exhaustive()
    }
}

impl NodeExecutor {
    pub fn new(invoker: Arc<dyn AgentInvoker>, memory: Arc<dyn AgentMemory>) -> Self {
        Self { invoker, memory }
    }

    /// Resolve the inputs for `node` from results already recorded in `execution`
    ///
    /// When two edges share an output channel the later edge wins.
    pub fn gather_inputs(node: &Node, workflow: &Workflow, execution: &Execution) -> Value {
        let mut inputs = Map::new();

        for edge in workflow.incoming_edges(&node.id) {
            if let Some(source) = execution.results.get(&edge.source) {
                inputs.insert(edge.output_channel().to_string(), source.output.clone());
            }
        }

        if inputs.is_empty() {
            execution.context.clone()
        } else {
            Value::Object(inputs)
        }
    }

    /// Execute one node of a live run
    ///
    /// On failure the error is appended to the run's `errors` before it is returned.
    pub async fn execute_node(&self, node: &Node, run: &RunHandle) -> Result<NodeResult> {
        tracing::info!("🚀 Starting node execution: {} (agent: {})", node.id, node.agent_id);

        let input = run
            .read(|execution| Self::gather_inputs(node, run.workflow(), execution))
            .await;
        tracing::debug!("📥 Input for '{}': {}", node.id, input);

        let start_time = Instant::now();
        let outcome = self.invoke(node, &input, run.context()).await;
        let duration = start_time.elapsed();

        match outcome {
            Ok(result) => {
                tracing::info!("✅ Node execution completed: {} in {:?}", node.id, duration);
                Ok(result)
            }
            Err(cause) => {
                let cause = format!("{:#}", cause);
                tracing::error!("❌ Node execution failed: {} in {:?} - Error: {}",
                    node.id, duration, cause);
                run.record_error(&node.id, &cause).await;
                Err(OrchestratorError::NodeExecution {
                    node_id: node.id.clone(),
                    cause,
                })
            }
        }
    }

    async fn invoke(&self, node: &Node, input: &Value, context: &Value) -> anyhow::Result<NodeResult> {
        let start_time = Instant::now();

        let memory = self.memory.get(&node.agent_id).await?;
        let output = self.invoker.invoke(&node.agent_id, input, &memory).await?;

        let result = NodeResult {
            node_id: node.id.clone(),
            agent_id: node.agent_id.clone(),
            input: input.clone(),
            output,
            executed_at: Utc::now(),
            duration_ms: start_time.elapsed().as_millis() as i64,
        };

        // Visible to later runs of the same agent, not just this one
        self.memory
            .set(
                &node.agent_id,
                json!({
                    "lastExecution": result,
                    "context": context,
                }),
            )
            .await?;

        Ok(result)
    }
}
