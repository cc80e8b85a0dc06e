//! # Shardline Routing
//!
//! Data-source routing for horizontally sharded relational storage.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Map an application-level shard key (store id, user id, UUID) to the
//! physical database shard that owns it:
//! - Consistent hash ring (CRC32, virtual nodes) for key-to-shard placement
//! - Shard registry with lazily opened master/replica connection pools
//! - Dispatcher resolving keys to live shards
//! - Topology manager swapping ring and registry atomically on change
//!
//! ## Guarantees
//!
//! | Property | Description |
//! |----------|-------------|
//! | Determinism | Same key + same shard set + same virtual node count = same shard |
//! | Minimal disruption | Adding/removing one of N shards moves ~1/N of keys |
//! | Lazy I/O | No connection opens before a query, UUID or checkout needs one |
//! | Atomic reconfiguration | Readers see the old or the new topology, never a mix |
//!
//! ## Module Structure
//!
//! ```text
//! shardline-routing/
//! ├── domain/          # Topology model, shard keys, policies, errors
//! ├── algorithms/      # Consistent hash ring
//! ├── ports/           # Hasher/repository seams + connection and store traits
//! ├── runtime/         # Pools, shards, registry, dispatcher, cluster
//! ├── adapters/        # File and document-store topology sources
//! └── config.rs        # Tunables (TOML + environment)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use shardline_routing::{FileSource, MockConnector, ShardCluster, ShardingConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), shardline_routing::ShardingError> {
//! let source = FileSource::new("shards.toml");
//! let cluster = ShardCluster::from_source(
//!     &source,
//!     ShardingConfig::default().with_env_overrides(),
//!     Arc::new(MockConnector::new()),
//! )
//! .await?;
//!
//! let shard = cluster.dispatch("TW001")?;
//! let order_id = shard.query_uuid().await?;
//! # let _ = order_id;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod runtime;

// Re-exports
pub use adapters::{DocumentStoreSource, FileFormat, FileSource, InMemoryDocumentStore};
pub use algorithms::{hash_key, HashRing, RingEntry};
pub use config::{PoolConfig, ShardingConfig};
pub use domain::{
    ConnectionError, HashVersion, NodeDescriptor, NodeRole, NodeSelection, ReadPolicy,
    ReadPreference, ShardId, ShardKey, ShardMapping, ShardSpec, ShardingError, ShardingResult,
    DEFAULT_VIRTUAL_NODES, MAX_VIRTUAL_NODES,
};
pub use ports::{
    Connection, Connector, DocumentStore, Hasher, MockConnection, MockConnector, PutOutcome,
    ShardRepository, TopologySource, VersionedDocument,
};
pub use runtime::{
    ClusterSnapshot, NodePool, PooledConnection, Shard, ShardCluster, ShardCollection,
    ShardDispatcher, TopologyChange,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
