//! Shard registry: the live shards of one topology, in declaration order.

use super::dispatcher::ShardDispatcher;
use super::shard::Shard;
use crate::algorithms::HashRing;
use crate::config::ShardingConfig;
use crate::domain::{
    invariant_ring_matches_registry, ShardId, ShardMapping, ShardingError, ShardingResult,
};
use crate::ports::{Connector, Hasher};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// `ShardId -> Shard`, insertion-ordered.
///
/// The mapping snapshot always lists exactly the registered shards: `set`
/// and `remove` update both. Dispatch never mutates the registry.
#[derive(Clone, Debug)]
pub struct ShardCollection {
    order: Vec<ShardId>,
    shards: HashMap<ShardId, Arc<Shard>>,
    mapping: ShardMapping,
    virtual_nodes: usize,
}

impl ShardCollection {
    /// Empty registry whose default ring uses `virtual_nodes` per shard.
    pub fn new(virtual_nodes: usize) -> Self {
        Self {
            order: Vec::new(),
            shards: HashMap::new(),
            mapping: ShardMapping::empty(),
            virtual_nodes,
        }
    }

    /// Build one [`Shard`] per mapping entry. Opens no connections.
    pub fn from_mapping(
        mapping: &ShardMapping,
        connector: Arc<dyn Connector>,
        config: &ShardingConfig,
    ) -> ShardingResult<Self> {
        let shards = mapping
            .iter()
            .map(|spec| {
                Arc::new(Shard::new(
                    spec.clone(),
                    Arc::clone(&connector),
                    config.read_policy,
                    config.pool.clone(),
                ))
            })
            .collect();
        Self::from_shards(shards, config.virtual_nodes_per_shard)
    }

    /// Registry over already-built shards, keeping their order.
    pub fn from_shards(shards: Vec<Arc<Shard>>, virtual_nodes: usize) -> ShardingResult<Self> {
        let mapping = ShardMapping::new(shards.iter().map(|s| s.spec().clone()).collect())?;
        let order = shards.iter().map(|s| s.id().clone()).collect();
        let shards = shards.into_iter().map(|s| (s.id().clone(), s)).collect();
        Ok(Self {
            order,
            shards,
            mapping,
            virtual_nodes,
        })
    }

    /// Look up a shard.
    pub fn get(&self, id: &ShardId) -> ShardingResult<Arc<Shard>> {
        self.shards
            .get(id)
            .cloned()
            .ok_or_else(|| ShardingError::ShardNotFound(id.clone()))
    }

    /// Whether a shard is registered.
    pub fn contains(&self, id: &ShardId) -> bool {
        self.shards.contains_key(id)
    }

    /// Register `shard` under its own id, replacing any previous entry in
    /// place. Returns the replaced shard.
    pub fn set(&mut self, shard: Arc<Shard>) -> ShardingResult<Option<Arc<Shard>>> {
        self.mapping = self.mapping.with_shard(shard.spec().clone())?;
        let id = shard.id().clone();
        let previous = self.shards.insert(id.clone(), shard);
        if previous.is_none() {
            self.order.push(id);
        }
        Ok(previous)
    }

    /// Unregister a shard. Returns it if it was present.
    pub fn remove(&mut self, id: &ShardId) -> Option<Arc<Shard>> {
        let removed = self.shards.remove(id)?;
        self.order.retain(|o| o != id);
        // Registered ids are always in the mapping
        if let Ok(mapping) = self.mapping.without_shard(id) {
            self.mapping = mapping;
        }
        Some(removed)
    }

    /// Shards in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ShardId, &Arc<Shard>)> {
        self.order
            .iter()
            .filter_map(move |id| self.shards.get(id).map(|s| (id, s)))
    }

    /// Shard ids in insertion order.
    pub fn ids(&self) -> &[ShardId] {
        &self.order
    }

    /// Topology snapshot matching the registered shards.
    pub fn mapping(&self) -> &ShardMapping {
        &self.mapping
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no shard is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Virtual nodes used for the default ring.
    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    /// Build a dispatcher over a snapshot of this registry.
    ///
    /// Without a hasher, a [`HashRing`] is built from the current mapping.
    pub fn create_dispatcher(&self, hasher: Option<Arc<dyn Hasher>>) -> ShardDispatcher {
        let hasher = match hasher {
            Some(hasher) => {
                let ring_ids = hasher.shard_ids();
                let missing = invariant_ring_matches_registry(&ring_ids, &self.order);
                if !missing.is_empty() {
                    warn!(?missing, "Hasher routes to shards absent from the registry");
                }
                hasher
            }
            None => Arc::new(HashRing::build(&self.mapping, self.virtual_nodes)),
        };
        ShardDispatcher::new(hasher, Arc::new(self.clone()))
    }
}
