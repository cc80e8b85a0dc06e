//! Topology manager.
//!
//! Holds the current (registry, ring) snapshot and replaces it wholesale on
//! every topology change. Readers clone the snapshot `Arc` and dispatch
//! against it without further locking; writers serialise on a mutex, build a
//! complete new snapshot, then swap it in under the write lock.

use super::dispatcher::ShardDispatcher;
use super::registry::ShardCollection;
use super::shard::Shard;
use crate::algorithms::HashRing;
use crate::config::ShardingConfig;
use crate::domain::{ShardId, ShardKey, ShardMapping, ShardSpec, ShardingResult};
use crate::ports::{Connector, TopologySource};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

/// One immutable view of the cluster.
#[derive(Clone)]
pub struct ClusterSnapshot {
    epoch: u64,
    ring: Arc<HashRing>,
    dispatcher: ShardDispatcher,
}

impl ClusterSnapshot {
    /// Monotonic counter, bumped on every applied change.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Ring for this snapshot.
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// Dispatcher bound to this snapshot.
    pub fn dispatcher(&self) -> &ShardDispatcher {
        &self.dispatcher
    }

    /// Registry for this snapshot.
    pub fn registry(&self) -> &ShardCollection {
        self.dispatcher.registry()
    }
}

/// What an applied topology change did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopologyChange {
    /// Epoch of the new snapshot.
    pub epoch: u64,
    /// Shards that did not exist before.
    pub added: Vec<ShardId>,
    /// Shards whose node list changed; rebuilt with fresh pools.
    pub updated: Vec<ShardId>,
    /// Shards that no longer exist.
    pub removed: Vec<ShardId>,
    /// Same shards and specs, but declared in a different order.
    pub reordered: bool,
}

impl TopologyChange {
    /// True when the new mapping matched the old one exactly.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && !self.reordered
    }
}

/// Live shard cluster with single-writer topology updates.
pub struct ShardCluster {
    state: RwLock<Arc<ClusterSnapshot>>,
    writer: Mutex<()>,
    connector: Arc<dyn Connector>,
    config: ShardingConfig,
}

impl ShardCluster {
    /// Build the initial snapshot. Opens no connections.
    pub fn new(
        mapping: ShardMapping,
        config: ShardingConfig,
        connector: Arc<dyn Connector>,
    ) -> ShardingResult<Self> {
        config.validate()?;
        mapping.validate()?;

        let registry = ShardCollection::from_mapping(&mapping, Arc::clone(&connector), &config)?;
        let snapshot = Self::snapshot_for(registry, &config, 0);

        info!(
            shards = mapping.len(),
            virtual_nodes = config.virtual_nodes_per_shard,
            "Shard cluster ready"
        );

        Ok(Self {
            state: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            connector,
            config,
        })
    }

    /// Load the topology from `source` and build the cluster.
    pub async fn from_source(
        source: &dyn TopologySource,
        config: ShardingConfig,
        connector: Arc<dyn Connector>,
    ) -> ShardingResult<Self> {
        let mapping = source.load().await?;
        Self::new(mapping, config, connector)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ClusterSnapshot> {
        Arc::clone(&self.state.read())
    }

    /// Dispatcher bound to the current snapshot.
    pub fn dispatcher(&self) -> ShardDispatcher {
        self.snapshot().dispatcher.clone()
    }

    /// Resolve `key` against the current snapshot.
    pub fn dispatch(&self, key: impl Into<ShardKey>) -> ShardingResult<Arc<Shard>> {
        self.snapshot().dispatcher.dispatch(key)
    }

    /// Look up a shard by id in the current snapshot.
    pub fn shard(&self, id: &ShardId) -> ShardingResult<Arc<Shard>> {
        self.snapshot().registry().get(id)
    }

    /// Current topology.
    pub fn mapping(&self) -> ShardMapping {
        self.snapshot().registry().mapping().clone()
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.snapshot().epoch
    }

    /// Runtime configuration.
    pub fn config(&self) -> &ShardingConfig {
        &self.config
    }

    /// Add a shard, or replace the node list of an existing one.
    pub fn add_shard(&self, spec: ShardSpec) -> ShardingResult<TopologyChange> {
        let _guard = self.writer.lock();
        let mapping = self.snapshot().registry().mapping().with_shard(spec)?;
        self.apply_locked(mapping)
    }

    /// Remove a shard and release its connections.
    pub fn remove_shard(&self, id: &ShardId) -> ShardingResult<TopologyChange> {
        let _guard = self.writer.lock();
        let mapping = self.snapshot().registry().mapping().without_shard(id)?;
        self.apply_locked(mapping)
    }

    /// Replace the whole topology.
    ///
    /// Shards whose spec is unchanged keep their live pools.
    pub fn apply_mapping(&self, mapping: ShardMapping) -> ShardingResult<TopologyChange> {
        mapping.validate()?;
        let _guard = self.writer.lock();
        self.apply_locked(mapping)
    }

    /// Reload the topology from `source` and apply it.
    pub async fn reload(&self, source: &dyn TopologySource) -> ShardingResult<TopologyChange> {
        let mapping = source.load().await?;
        debug!(source = %source.describe(), shards = mapping.len(), "Loaded topology");
        self.apply_mapping(mapping)
    }

    fn apply_locked(&self, mapping: ShardMapping) -> ShardingResult<TopologyChange> {
        let current = self.snapshot();
        let old = current.registry();

        let mut change = TopologyChange {
            epoch: current.epoch + 1,
            ..TopologyChange::default()
        };
        let mut retired = Vec::new();

        let mut shards = Vec::with_capacity(mapping.len());
        for spec in mapping.iter() {
            match old.get(&spec.id) {
                Ok(existing) if existing.spec() == spec => shards.push(existing),
                Ok(existing) => {
                    change.updated.push(spec.id.clone());
                    retired.push(existing);
                    shards.push(self.build_shard(spec));
                }
                Err(_) => {
                    change.added.push(spec.id.clone());
                    shards.push(self.build_shard(spec));
                }
            }
        }
        for (id, shard) in old.iter() {
            if !mapping.contains(id) {
                change.removed.push(id.clone());
                retired.push(Arc::clone(shard));
            }
        }

        change.reordered = change.added.is_empty()
            && change.removed.is_empty()
            && mapping.shard_ids() != old.mapping().shard_ids();
        if change.is_noop() {
            debug!(epoch = current.epoch, "Topology unchanged");
            return Ok(TopologyChange {
                epoch: current.epoch,
                ..TopologyChange::default()
            });
        }

        let registry = ShardCollection::from_shards(shards, self.config.virtual_nodes_per_shard)?;
        let snapshot = Self::snapshot_for(registry, &self.config, change.epoch);
        *self.state.write() = Arc::new(snapshot);

        for shard in retired {
            shard.release_connections();
        }

        info!(
            epoch = change.epoch,
            added = ?change.added,
            updated = ?change.updated,
            removed = ?change.removed,
            reordered = change.reordered,
            "Applied topology change"
        );
        Ok(change)
    }

    fn build_shard(&self, spec: &ShardSpec) -> Arc<Shard> {
        Arc::new(Shard::new(
            spec.clone(),
            Arc::clone(&self.connector),
            self.config.read_policy,
            self.config.pool.clone(),
        ))
    }

    fn snapshot_for(registry: ShardCollection, config: &ShardingConfig, epoch: u64) -> ClusterSnapshot {
        let ring = Arc::new(HashRing::build(registry.mapping(), config.virtual_nodes_per_shard));
        let dispatcher = ShardDispatcher::new(ring.clone(), Arc::new(registry));
        ClusterSnapshot {
            epoch,
            ring,
            dispatcher,
        }
    }
}
