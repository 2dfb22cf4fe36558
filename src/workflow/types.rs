/// Core workflow type definitions
///
/// Defines workflows, nodes and edges. These are serialized as camelCase JSON for
/// persistence and are treated as read-only once a run has loaded them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output channel used when an edge does not name one
pub const DEFAULT_OUTPUT_CHANNEL: &str = "output";

/// A complete workflow definition containing nodes and their connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-research")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nodes in declaration order; this order drives deterministic sorting
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges in declaration order
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub config: WorkflowConfig,
}

/// A single vertex bound to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node identifier within the workflow (e.g., "n1", "planner")
    pub id: String,
    /// Agent that performs this node's work
    pub agent_id: String,
    /// Opaque node configuration, never interpreted by the engine
    #[serde(default)]
    pub config: Value,
}

/// Dependency and data-routing arc: `target` depends on `source`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Key under which the source output lands in the target's inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
}

/// Per-workflow execution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

/// How the coordinator drives the sorted nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One node at a time in topological order
    #[default]
    Sequential,
    /// Level by level, every node of a level concurrently
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(format!("unknown execution mode: {}", other)),
        }
    }
}

impl Edge {
    /// Create an edge on the default output channel
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_output: None,
        }
    }

    /// Create an edge that delivers the source output under `label`
    pub fn labelled(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_output: Some(label.into()),
        }
    }

    /// Input key this edge writes into, falling back to "output"
    pub fn output_channel(&self) -> &str {
        self.source_output.as_deref().unwrap_or(DEFAULT_OUTPUT_CHANNEL)
    }
}

impl Node {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            config: Value::Null,
        }
    }
}

impl Workflow {
    /// Edges whose target is `node_id`, in declaration order
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_original_json_layout() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf_1",
            "name": "research",
            "nodes": [
                { "id": "a", "agentId": "planner" },
                { "id": "b", "agentId": "writer", "config": { "tone": "dry" } }
            ],
            "edges": [ { "source": "a", "target": "b", "sourceOutput": "plan" } ],
            "config": { "executionMode": "parallel" }
        }))
        .unwrap();

        assert_eq!(workflow.config.execution_mode, ExecutionMode::Parallel);
        assert_eq!(workflow.nodes[1].config["tone"], "dry");
        assert_eq!(workflow.edges[0].output_channel(), "plan");
    }

    #[test]
    fn missing_config_defaults_to_sequential() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf_2",
            "name": "bare",
            "nodes": [],
            "edges": []
        }))
        .unwrap();

        assert_eq!(workflow.config.execution_mode, ExecutionMode::Sequential);
    }

    #[test]
    fn unlabelled_edge_uses_default_channel() {
        assert_eq!(Edge::new("a", "b").output_channel(), DEFAULT_OUTPUT_CHANNEL);
    }

    #[test]
    fn execution_mode_parses_case_insensitively() {
        assert_eq!("Parallel".parse::<ExecutionMode>(), Ok(ExecutionMode::Parallel));
        assert!("eager".parse::<ExecutionMode>().is_err());
    }
}
