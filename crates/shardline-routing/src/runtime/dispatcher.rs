//! Shard dispatcher: hasher + registry.

use super::registry::ShardCollection;
use super::shard::Shard;
use crate::domain::{ShardId, ShardKey, ShardingError, ShardingResult};
use crate::ports::Hasher;
use std::sync::Arc;
use tracing::error;

/// Resolves shard keys to live shards.
///
/// Holds immutable snapshots only, so `dispatch` is safe to call from any
/// number of threads without locking.
#[derive(Clone)]
pub struct ShardDispatcher {
    hasher: Arc<dyn Hasher>,
    registry: Arc<ShardCollection>,
}

impl ShardDispatcher {
    /// Pair a hasher with a registry snapshot.
    pub fn new(hasher: Arc<dyn Hasher>, registry: Arc<ShardCollection>) -> Self {
        Self { hasher, registry }
    }

    /// Resolve `key` to its shard.
    ///
    /// # Errors
    ///
    /// - [`ShardingError::NoShardsAvailable`] from an empty hasher
    /// - [`ShardingError::TopologyInconsistent`] when the hasher names a shard
    ///   that is not registered
    pub fn dispatch(&self, key: impl Into<ShardKey>) -> ShardingResult<Arc<Shard>> {
        let key = key.into();
        let shard_id = self.hasher.dispatch(&key)?;

        if let Ok(shard) = self.registry.get(&shard_id) {
            return Ok(shard);
        }

        error!(shard = %shard_id, %key, "Hasher and registry disagree");
        Err(ShardingError::TopologyInconsistent {
            shard: shard_id,
            key: key.to_string(),
        })
    }

    /// Resolve `key` to a shard id without touching the registry.
    pub fn dispatch_id(&self, key: impl Into<ShardKey>) -> ShardingResult<ShardId> {
        self.hasher.dispatch(&key.into())
    }

    /// Registry snapshot this dispatcher resolves against.
    pub fn registry(&self) -> &ShardCollection {
        &self.registry
    }

    /// Hasher in use.
    pub fn hasher(&self) -> &Arc<dyn Hasher> {
        &self.hasher
    }
}
