//! # Domain Invariants
//!
//! Rules that every topology value must satisfy.

use super::entities::ShardSpec;
use super::errors::{ShardingError, ShardingResult};
use super::value_objects::{NodeRole, ShardId};
use std::collections::HashSet;

/// Virtual nodes per shard when nothing is configured.
pub const DEFAULT_VIRTUAL_NODES: usize = 64;

/// Upper bound on virtual nodes per shard.
pub const MAX_VIRTUAL_NODES: usize = 4096;

/// Invariant: no two shards share an id.
pub fn invariant_unique_shard_ids(shards: &[ShardSpec]) -> ShardingResult<()> {
    let mut seen = HashSet::new();
    for spec in shards {
        if !seen.insert(&spec.id) {
            return Err(ShardingError::config(
                "mapping",
                format!("duplicate shard id {}", spec.id),
            ));
        }
    }
    Ok(())
}

/// Invariant: shard ids are non-empty.
pub fn invariant_non_empty_id(id: &ShardId) -> ShardingResult<()> {
    if id.as_str().trim().is_empty() {
        return Err(ShardingError::config("mapping", "empty shard id"));
    }
    Ok(())
}

/// Invariant: the master is labelled master and every replica is labelled replica.
pub fn invariant_node_roles(spec: &ShardSpec) -> ShardingResult<()> {
    if spec.master.role != NodeRole::Master {
        return Err(ShardingError::config(
            "mapping",
            format!("shard {} master {} has role {}", spec.id, spec.master.dsn, spec.master.role),
        ));
    }
    if let Some(bad) = spec.replicas.iter().find(|r| r.role != NodeRole::Replica) {
        return Err(ShardingError::config(
            "mapping",
            format!("shard {} replica {} has role {}", spec.id, bad.dsn, bad.role),
        ));
    }
    Ok(())
}

/// Invariant: the registry and the hasher agree on the shard set.
///
/// Returns the ids known to `ring_ids` but missing from `registry_ids`.
pub fn invariant_ring_matches_registry<'a>(
    ring_ids: &'a [ShardId],
    registry_ids: &[ShardId],
) -> Vec<&'a ShardId> {
    let registered: HashSet<&ShardId> = registry_ids.iter().collect();
    ring_ids.iter().filter(|id| !registered.contains(id)).collect()
}
