//! # Inbound Ports
//!
//! Seams the ORM layer plugs into: custom hashers and repository types.

use crate::domain::{ShardId, ShardKey, ShardingResult};
use crate::runtime::Shard;
use std::sync::Arc;

/// Deterministic key-to-shard function.
///
/// Implementations must be pure: the same key yields the same shard for as
/// long as the implementation value is unchanged.
pub trait Hasher: Send + Sync {
    /// Resolve a key to a shard id.
    fn dispatch(&self, key: &ShardKey) -> ShardingResult<ShardId>;

    /// Every shard this hasher can return.
    fn shard_ids(&self) -> Vec<ShardId>;
}

/// A repository type that can be bound to one shard.
///
/// Binding must not perform I/O; repositories check out connections from the
/// shard when they run a query.
pub trait ShardRepository: Sized {
    /// Bind to `shard`.
    fn bind(shard: Arc<Shard>) -> Self;
}
