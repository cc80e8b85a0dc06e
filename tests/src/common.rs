//! Shared fixtures for the integration suites.

use shardline_routing::{
    NodeDescriptor, Shard, ShardMapping, ShardRepository, ShardSpec, ShardingResult,
};
use std::sync::{Arc, Once};
use uuid::Uuid;

static TRACING: Once = Once::new();

/// Install a test subscriber once per process. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Shard spec with `replicas` replicas and MySQL-style DSNs.
pub fn shard_spec(id: &str, replicas: usize) -> ShardSpec {
    (0..replicas).fold(
        ShardSpec::new(
            id,
            NodeDescriptor::master(format!("mysql://{}-master:3306/store", id))
                .with_credentials("store", "secret"),
        ),
        |spec, r| {
            spec.with_replica(NodeDescriptor::replica(format!(
                "mysql://{}-replica{}:3306/store",
                id, r
            )))
        },
    )
}

/// Mapping over `ids`, each with `replicas` replicas.
pub fn mapping(ids: &[&str], replicas: usize) -> ShardMapping {
    ShardMapping::new(ids.iter().map(|id| shard_spec(id, replicas)).collect())
        .expect("fixture mapping is valid")
}

/// Order repository bound to one shard.
pub struct OrderRepo {
    shard: Arc<Shard>,
}

impl OrderRepo {
    /// Shard this repository writes to.
    pub fn shard(&self) -> &Arc<Shard> {
        &self.shard
    }

    /// Allocate an order id from the shard master.
    pub async fn next_order_id(&self) -> ShardingResult<Uuid> {
        self.shard.query_uuid().await
    }
}

impl ShardRepository for OrderRepo {
    fn bind(shard: Arc<Shard>) -> Self {
        Self { shard }
    }
}
