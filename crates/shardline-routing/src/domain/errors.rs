//! # Domain Errors
//!
//! Error types for the shard routing core.
//!
//! Every variant carries the shard and/or key that caused it so callers can
//! report the failure without re-deriving routing context.

use super::value_objects::ShardId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type ShardingResult<T> = Result<T, ShardingError>;

/// Routing and topology errors.
#[derive(Debug, Error)]
pub enum ShardingError {
    /// The ring has zero entries.
    #[error("No shards available to dispatch key {key}")]
    NoShardsAvailable {
        /// Rendered shard key.
        key: String,
    },

    /// The hasher returned a shard that the registry does not hold.
    #[error("Topology inconsistent: hasher routed key {key} to shard {shard}, which is not registered")]
    TopologyInconsistent {
        /// Shard named by the hasher.
        shard: ShardId,
        /// Rendered shard key.
        key: String,
    },

    /// Direct registry lookup for an unknown shard.
    #[error("Unknown shard: {0}")]
    ShardNotFound(ShardId),

    /// Topology or configuration could not be read, parsed or validated.
    #[error("Failed to load {source_name}: {reason}")]
    ConfigLoad {
        /// File path or document id.
        source_name: String,
        /// What went wrong.
        reason: String,
    },

    /// Connection layer failure, propagated unchanged.
    #[error("Connection to shard {shard} ({node}) failed: {source}")]
    Connection {
        /// Shard whose node failed.
        shard: ShardId,
        /// Node address.
        node: String,
        /// Underlying connection error.
        #[source]
        source: ConnectionError,
    },

    /// The master could not produce a usable identifier.
    #[error("UUID generation failed on shard {shard}: {reason}")]
    UuidGeneration {
        /// Shard whose master was asked.
        shard: ShardId,
        /// What went wrong.
        reason: String,
    },

    /// Optimistic version check failed on a topology write.
    #[error("Topology version conflict: expected {expected}, found {actual}")]
    TopologyConflict {
        /// Version the writer based its change on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// The document store failed while writing or deleting topology.
    #[error("Topology store failed on {document}: {source}")]
    TopologyStore {
        /// Document id.
        document: String,
        /// Underlying store error.
        #[source]
        source: ConnectionError,
    },
}

impl ShardingError {
    /// Shorthand for a [`ShardingError::ConfigLoad`].
    pub fn config(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConfigLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the external connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Remote refused or rejected the connection.
    #[error("connection refused: {0}")]
    Refused(String),

    /// Connect, checkout or operation exceeded its time budget.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Connection was closed underneath the caller.
    #[error("connection closed")]
    Closed,

    /// Anything else the driver reports.
    #[error("{0}")]
    Other(String),
}
