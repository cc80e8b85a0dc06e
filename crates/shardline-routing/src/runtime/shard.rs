//! Runtime handle for one logical shard.

use super::pool::{NodePool, PooledConnection};
use crate::config::PoolConfig;
use crate::domain::{
    NodeSelection, ReadPolicy, ReadPreference, ShardId, ShardSpec, ShardingError, ShardingResult,
};
use crate::ports::{Connector, ShardRepository};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

/// One master pool plus replica pools, and the read routing policy.
///
/// Building a `Shard` performs no I/O.
pub struct Shard {
    spec: ShardSpec,
    master: Arc<NodePool>,
    replicas: Vec<Arc<NodePool>>,
    read_policy: ReadPolicy,
    next_replica: AtomicUsize,
    pool_config: PoolConfig,
}

impl Shard {
    /// Create a shard from its spec.
    pub fn new(
        spec: ShardSpec,
        connector: Arc<dyn Connector>,
        read_policy: ReadPolicy,
        pool_config: PoolConfig,
    ) -> Self {
        let master = Arc::new(NodePool::new(
            spec.id.clone(),
            spec.master.clone(),
            Arc::clone(&connector),
            pool_config.clone(),
        ));
        let replicas = spec
            .replicas
            .iter()
            .map(|node| {
                Arc::new(NodePool::new(
                    spec.id.clone(),
                    node.clone(),
                    Arc::clone(&connector),
                    pool_config.clone(),
                ))
            })
            .collect();

        Self {
            spec,
            master,
            replicas,
            read_policy,
            next_replica: AtomicUsize::new(0),
            pool_config,
        }
    }

    /// Shard identifier.
    pub fn id(&self) -> &ShardId {
        &self.spec.id
    }

    /// Topology entry this shard was built from.
    pub fn spec(&self) -> &ShardSpec {
        &self.spec
    }

    /// Read routing policy.
    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Bind a repository type to this shard. No I/O.
    pub fn repo<R: ShardRepository>(self: &Arc<Self>) -> R {
        R::bind(Arc::clone(self))
    }

    /// Ask the master for a globally unique identifier.
    ///
    /// # Errors
    ///
    /// - [`ShardingError::Connection`] if no master connection could be
    ///   obtained
    /// - [`ShardingError::UuidGeneration`] if the master failed, timed out or
    ///   returned the nil UUID
    pub async fn query_uuid(&self) -> ShardingResult<Uuid> {
        let mut conn = self.write_connection().await?;

        let outcome = timeout(self.pool_config.operation_timeout(), conn.generate_uuid()).await;
        let generated = match outcome {
            Ok(result) => result,
            Err(_) => {
                // Connection state is unknown after an abandoned call
                conn.discard();
                return Err(self.uuid_failure(format!(
                    "timed out after {}ms",
                    self.pool_config.operation_timeout_ms
                )));
            }
        };

        match generated {
            Ok(uuid) if uuid.is_nil() => Err(self.uuid_failure("master returned the nil UUID".to_string())),
            Ok(uuid) => Ok(uuid),
            Err(e) => Err(self.uuid_failure(e.to_string())),
        }
    }

    /// Pick the node a read should go to. Pure; opens nothing.
    pub fn select_read_node(&self, preference: ReadPreference) -> NodeSelection {
        if preference == ReadPreference::ForceMaster || self.replicas.is_empty() {
            return NodeSelection::Master;
        }

        match self.read_policy {
            ReadPolicy::AlwaysMaster => NodeSelection::Master,
            ReadPolicy::RandomReplica => {
                NodeSelection::Replica(rand::thread_rng().gen_range(0..self.replicas.len()))
            }
            ReadPolicy::RoundRobinReplica => {
                let n = self.next_replica.fetch_add(1, Ordering::Relaxed);
                NodeSelection::Replica(n % self.replicas.len())
            }
        }
    }

    /// Check out a connection for a read.
    pub async fn read_connection(&self, preference: ReadPreference) -> ShardingResult<PooledConnection> {
        let selection = self.select_read_node(preference);
        debug!(shard = %self.id(), ?selection, "Read routed");
        self.pool_for(selection).checkout().await
    }

    /// Check out a master connection for a write.
    pub async fn write_connection(&self) -> ShardingResult<PooledConnection> {
        self.master.checkout().await
    }

    /// Live connections per node, master first.
    pub fn connected_nodes(&self) -> Vec<(String, usize)> {
        std::iter::once(&self.master)
            .chain(self.replicas.iter())
            .map(|pool| (pool.node().dsn.clone(), pool.open_connections()))
            .collect()
    }

    /// Total live connections across every node.
    pub fn open_connections(&self) -> usize {
        self.connected_nodes().iter().map(|(_, n)| n).sum()
    }

    /// Close every pool. Further checkouts fail with `Closed`.
    pub fn release_connections(&self) {
        self.master.close();
        for replica in &self.replicas {
            replica.close();
        }
    }

    fn pool_for(&self, selection: NodeSelection) -> &Arc<NodePool> {
        match selection {
            NodeSelection::Master => &self.master,
            NodeSelection::Replica(i) => &self.replicas[i],
        }
    }

    fn uuid_failure(&self, reason: String) -> ShardingError {
        warn!(shard = %self.id(), %reason, "UUID generation failed");
        ShardingError::UuidGeneration {
            shard: self.id().clone(),
            reason,
        }
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("id", &self.spec.id)
            .field("replicas", &self.replicas.len())
            .field("read_policy", &self.read_policy)
            .finish()
    }
}
