/// Per-agent continuity state
///
/// Node executions read an agent's last state before invoking it and write
/// `{lastExecution, context}` back afterwards. Writes merge into the existing object.
///
/// Two nodes bound to the same agent inside one parallel level race on this state;
/// the last writer wins and callers must not assume isolation between them.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default cap on the number of agents kept in memory
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[async_trait]
pub trait AgentMemory: Send + Sync {
    /// Last stored state for the agent, an empty object when none exists
    async fn get(&self, agent_id: &str) -> Result<Value>;

    /// Merge `state` into the agent's entry and return the merged value
    async fn set(&self, agent_id: &str, state: Value) -> Result<Value>;
}

/// Bounded in-process memory store
///
/// When more than `max_entries` agents are stored, the least recently updated
/// entries are dropped.
#[derive(Debug)]
pub struct InMemoryAgentMemory {
    entries: RwLock<HashMap<String, Value>>,
    max_entries: usize,
}

impl Default for InMemoryAgentMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryAgentMemory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    /// Forget one agent; returns whether it was present
    pub async fn delete(&self, agent_id: &str) -> bool {
        self.entries.write().await.remove(agent_id).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn updated_at(value: &Value) -> i64 {
        value.get("updatedAt").and_then(Value::as_i64).unwrap_or(0)
    }

    fn prune(entries: &mut HashMap<String, Value>, max_entries: usize) {
        if entries.len() <= max_entries {
            return;
        }

        let mut by_age: Vec<(String, i64)> = entries
            .iter()
            .map(|(agent_id, value)| (agent_id.clone(), Self::updated_at(value)))
            .collect();
        // Oldest first; ties broken by id so eviction is deterministic
        by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let excess = entries.len() - max_entries;
        for (agent_id, _) in by_age.into_iter().take(excess) {
            entries.remove(&agent_id);
        }

        tracing::debug!("🧹 Pruned {} agent memory entries", excess);
    }
}

#[async_trait]
impl AgentMemory for InMemoryAgentMemory {
    async fn get(&self, agent_id: &str) -> Result<Value> {
        Ok(self
            .entries
            .read()
            .await
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    async fn set(&self, agent_id: &str, state: Value) -> Result<Value> {
        let mut entries = self.entries.write().await;

        let mut merged = match entries.remove(agent_id) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        match state {
            Value::Object(fields) => merged.extend(fields),
            other => {
                merged.insert("value".to_string(), other);
            }
        }
        merged.insert(
            "updatedAt".to_string(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );

        let merged = Value::Object(merged);
        entries.insert(agent_id.to_string(), merged.clone());
        Self::prune(&mut entries, self.max_entries);

        Ok(merged)
    }
}
