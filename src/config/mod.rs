/// Configuration management for the agentflow engine
///
/// Storage location and engine tuning, with env var overrides for container deployment.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Engine tuning
    pub engine: EngineConfig,
}

/// Where the SQLite database lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding agentflow.db (default: "data")
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Buffer size of the lifecycle event broadcast channel
    pub event_capacity: usize,
    /// Maximum number of agents kept in the in-memory agent memory store
    pub memory_max_entries: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(fallback)
}

impl Default for Config {
    /// Default configuration with ENV_VAR support
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                data_dir: std::env::var("AGENTFLOW_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            },
            engine: EngineConfig {
                event_capacity: env_or("AGENTFLOW_EVENT_CAPACITY", 256usize).max(1),
                memory_max_entries: env_or(
                    "AGENTFLOW_MEMORY_MAX_ENTRIES",
                    crate::agent::memory::DEFAULT_MAX_ENTRIES,
                ),
            },
        }
    }
}
