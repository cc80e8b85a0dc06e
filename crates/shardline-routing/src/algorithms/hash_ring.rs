//! # Consistent Hash Ring
//!
//! Deterministic key-to-shard assignment with virtual nodes.
//!
//! Each shard owns `V` positions on a 32-bit ring, placed at
//! `crc32("{shard_id}#{index}")`. A key is hashed with the same function and
//! routed to the first position at or after its hash, wrapping to the start of
//! the ring. Removing a shard only frees that shard's positions, so only keys
//! that landed on them move.

use crate::domain::{
    HashVersion, ShardId, ShardKey, ShardMapping, ShardingError, ShardingResult,
    MAX_VIRTUAL_NODES,
};
use crate::ports::inbound::Hasher;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One virtual node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingEntry {
    /// Position on the ring.
    pub position: u32,
    /// Owning shard.
    pub shard: ShardId,
}

/// Immutable consistent hash ring.
///
/// Rebuilt from scratch on every topology change; never patched in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashRing {
    entries: Vec<RingEntry>,
    shard_ids: Vec<ShardId>,
    virtual_nodes: usize,
    version: HashVersion,
}

impl HashRing {
    /// Build a ring from a topology mapping.
    pub fn build(mapping: &ShardMapping, virtual_nodes_per_shard: usize) -> Self {
        Self::from_shard_ids(&mapping.shard_ids(), virtual_nodes_per_shard)
    }

    /// Build a ring from bare shard ids.
    pub fn from_shard_ids(shard_ids: &[ShardId], virtual_nodes_per_shard: usize) -> Self {
        let virtual_nodes = clamp_virtual_nodes(virtual_nodes_per_shard);

        let mut entries = Vec::with_capacity(shard_ids.len() * virtual_nodes);
        for shard in shard_ids {
            for index in 0..virtual_nodes {
                entries.push(RingEntry {
                    position: virtual_node_position(shard, index),
                    shard: shard.clone(),
                });
            }
        }

        // Ties on position fall back to the shard id so the order is total
        entries.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.shard.cmp(&b.shard))
        });

        debug!(
            shards = shard_ids.len(),
            virtual_nodes,
            positions = entries.len(),
            "Built hash ring"
        );

        Self {
            entries,
            shard_ids: shard_ids.to_vec(),
            virtual_nodes,
            version: HashVersion::Crc32V1,
        }
    }

    /// Resolve a key to its owning shard.
    ///
    /// # Errors
    ///
    /// [`ShardingError::NoShardsAvailable`] when the ring is empty.
    pub fn route(&self, key: &ShardKey) -> ShardingResult<&ShardId> {
        if self.entries.is_empty() {
            return Err(ShardingError::NoShardsAvailable {
                key: key.to_string(),
            });
        }

        let hash = hash_key(key);
        let mut index = self.entries.partition_point(|e| e.position < hash);
        if index == self.entries.len() {
            index = 0;
        }

        Ok(&self.entries[index].shard)
    }

    /// Ring positions owned by `shard`, ascending.
    pub fn positions_for(&self, shard: &ShardId) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|e| &e.shard == shard)
            .map(|e| e.position)
            .collect()
    }

    /// Sorted ring entries.
    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no shard is on the ring.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Virtual nodes placed per shard.
    pub fn virtual_nodes_per_shard(&self) -> usize {
        self.virtual_nodes
    }

    /// Hash layout of this ring.
    pub fn version(&self) -> HashVersion {
        self.version
    }

    /// Count how many of `keys` land on each shard.
    ///
    /// Shards that receive no key are reported with zero.
    pub fn distribution<I, K>(&self, keys: I) -> BTreeMap<ShardId, usize>
    where
        I: IntoIterator<Item = K>,
        K: Into<ShardKey>,
    {
        let mut counts: BTreeMap<ShardId, usize> =
            self.shard_ids.iter().map(|id| (id.clone(), 0)).collect();
        for key in keys {
            if let Ok(shard) = self.route(&key.into()) {
                *counts.entry(shard.clone()).or_default() += 1;
            }
        }
        counts
    }
}

impl Hasher for HashRing {
    fn dispatch(&self, key: &ShardKey) -> ShardingResult<ShardId> {
        let shard = self.route(key)?.clone();
        debug!(%key, %shard, "Routed key");
        Ok(shard)
    }

    fn shard_ids(&self) -> Vec<ShardId> {
        self.shard_ids.clone()
    }
}

fn clamp_virtual_nodes(requested: usize) -> usize {
    if requested == 0 {
        warn!("virtual_nodes_per_shard = 0, using 1");
        return 1;
    }
    if requested > MAX_VIRTUAL_NODES {
        warn!(requested, max = MAX_VIRTUAL_NODES, "virtual_nodes_per_shard capped");
        return MAX_VIRTUAL_NODES;
    }
    requested
}

/// Ring position of a key.
pub fn hash_key(key: &ShardKey) -> u32 {
    crc32fast::hash(&key.hash_input())
}

/// Ring position of virtual node `index` of `shard`.
pub fn virtual_node_position(shard: &ShardId, index: usize) -> u32 {
    crc32fast::hash(format!("{}#{}", shard, index).as_bytes())
}
