//! # Routing Configuration
//!
//! Runtime knobs for the ring, read routing and per-node pools.
//!
//! ## Config File Format
//!
//! ```toml
//! virtual_nodes_per_shard = 64
//! read_policy = "round_robin_replica"
//!
//! [pool]
//! max_connections = 4
//! connect_timeout_ms = 5000
//! acquire_timeout_ms = 5000
//! operation_timeout_ms = 5000
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SHARDLINE_VIRTUAL_NODES` | `virtual_nodes_per_shard` |
//! | `SHARDLINE_READ_POLICY` | `read_policy` |
//! | `SHARDLINE_POOL_MAX_CONNECTIONS` | `pool.max_connections` |
//! | `SHARDLINE_CONNECT_TIMEOUT_MS` | `pool.connect_timeout_ms` |
//! | `SHARDLINE_ACQUIRE_TIMEOUT_MS` | `pool.acquire_timeout_ms` |
//! | `SHARDLINE_OPERATION_TIMEOUT_MS` | `pool.operation_timeout_ms` |

use crate::domain::{ReadPolicy, ShardingError, ShardingResult, DEFAULT_VIRTUAL_NODES};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Per-node connection pool limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections a single node pool may hold open.
    pub max_connections: usize,
    /// Budget for opening one connection.
    pub connect_timeout_ms: u64,
    /// Budget for waiting on a free pool slot.
    pub acquire_timeout_ms: u64,
    /// Budget for a single operation on a checked-out connection.
    pub operation_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            connect_timeout_ms: 5_000,
            acquire_timeout_ms: 5_000,
            operation_timeout_ms: 5_000,
        }
    }
}

impl PoolConfig {
    /// Connect budget.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Checkout budget.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Per-operation budget.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Sharding runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingConfig {
    /// Virtual nodes placed on the ring for each shard.
    pub virtual_nodes_per_shard: usize,
    /// Read routing used by every shard.
    pub read_policy: ReadPolicy,
    /// Pool limits used by every node.
    pub pool: PoolConfig,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            virtual_nodes_per_shard: DEFAULT_VIRTUAL_NODES,
            read_policy: ReadPolicy::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl ShardingConfig {
    /// Create config for testing: small ring, short timeouts.
    pub fn for_testing() -> Self {
        Self {
            virtual_nodes_per_shard: 16,
            read_policy: ReadPolicy::RoundRobinReplica,
            pool: PoolConfig {
                max_connections: 2,
                connect_timeout_ms: 200,
                acquire_timeout_ms: 200,
                operation_timeout_ms: 200,
            },
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ShardingError::ConfigLoad`] if the file cannot be read,
    /// parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> ShardingResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ShardingError::config(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ShardingError::ConfigLoad { reason, .. } => {
                ShardingError::config(path.display().to_string(), reason)
            }
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> ShardingResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ShardingError::config("sharding config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHARDLINE_*` environment overrides. Unparseable values are
    /// logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<usize>("SHARDLINE_VIRTUAL_NODES") {
            self.virtual_nodes_per_shard = v;
        }
        if let Ok(raw) = env::var("SHARDLINE_READ_POLICY") {
            match serde_json::from_value::<ReadPolicy>(serde_json::Value::String(raw.clone())) {
                Ok(policy) => self.read_policy = policy,
                Err(_) => warn!(value = %raw, "Ignoring unknown SHARDLINE_READ_POLICY"),
            }
        }
        if let Some(v) = env_parse::<usize>("SHARDLINE_POOL_MAX_CONNECTIONS") {
            self.pool.max_connections = v;
        }
        if let Some(v) = env_parse::<u64>("SHARDLINE_CONNECT_TIMEOUT_MS") {
            self.pool.connect_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u64>("SHARDLINE_ACQUIRE_TIMEOUT_MS") {
            self.pool.acquire_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u64>("SHARDLINE_OPERATION_TIMEOUT_MS") {
            self.pool.operation_timeout_ms = v;
        }
        self
    }

    /// Reject values the runtime cannot honour.
    pub fn validate(&self) -> ShardingResult<()> {
        if self.virtual_nodes_per_shard == 0 {
            return Err(ShardingError::config(
                "sharding config",
                "virtual_nodes_per_shard must be at least 1",
            ));
        }
        if self.pool.max_connections == 0 {
            return Err(ShardingError::config(
                "sharding config",
                "pool.max_connections must be at least 1",
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}
