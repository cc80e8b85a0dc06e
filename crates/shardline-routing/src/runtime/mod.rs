//! # Runtime
//!
//! Live shard objects: per-node pools, shards, the registry, the dispatcher
//! and the topology manager that swaps them atomically.

pub mod cluster;
pub mod dispatcher;
pub mod pool;
pub mod registry;
pub mod shard;

pub use cluster::{ClusterSnapshot, ShardCluster, TopologyChange};
pub use dispatcher::ShardDispatcher;
pub use pool::{NodePool, PooledConnection};
pub use registry::ShardCollection;
pub use shard::Shard;
