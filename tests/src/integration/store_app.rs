//! # Store Application Walkthrough
//!
//! A small store application: orders are sharded by store id, order ids
//! come from the owning shard, and repositories are bound per shard.

#[cfg(test)]
mod tests {
    use crate::common::{init_test_tracing, mapping, OrderRepo};
    use shardline_routing::{
        MockConnector, ReadPreference, ShardCluster, ShardId, ShardingConfig,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    const STORES: [&str; 3] = ["TW001", "TW002", "TW003"];

    fn store_cluster() -> (ShardCluster, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::new());
        let config = ShardingConfig {
            virtual_nodes_per_shard: 2,
            ..ShardingConfig::for_testing()
        };
        let cluster = ShardCluster::new(mapping(&["A", "B", "C"], 1), config, connector.clone()).unwrap();
        (cluster, connector)
    }

    #[tokio::test]
    async fn test_orders_follow_their_store() {
        init_test_tracing();
        let (cluster, _) = store_cluster();

        for store in STORES {
            let shard = cluster.dispatch(store).unwrap();
            let repo: OrderRepo = shard.repo();
            let order_id = repo.next_order_id().await.unwrap();

            assert!(!order_id.is_nil());
            // Same store, same shard, every time
            assert_eq!(cluster.dispatch(store).unwrap().id(), repo.shard().id());
        }
    }

    #[tokio::test]
    async fn test_removing_a_shard_keeps_other_stores_in_place() {
        let (cluster, _) = store_cluster();
        let before: HashMap<&str, ShardId> = STORES
            .iter()
            .map(|s| (*s, cluster.dispatch(*s).unwrap().id().clone()))
            .collect();

        cluster.remove_shard(&ShardId::new("B")).unwrap();

        for store in STORES {
            let now = cluster.dispatch(store).unwrap().id().clone();
            assert_ne!(now.as_str(), "B");
            if before[store].as_str() != "B" {
                assert_eq!(now, before[store], "store {} moved", store);
            }
        }
    }

    #[tokio::test]
    async fn test_reads_use_replicas_and_writes_use_master() {
        let (cluster, connector) = store_cluster();
        let shard = cluster.dispatch("TW002").unwrap();
        let id = shard.id().as_str().to_string();

        drop(shard.read_connection(ReadPreference::Policy).await.unwrap());
        drop(shard.write_connection().await.unwrap());

        assert_eq!(connector.connects_to(&format!("mysql://{}-replica0:3306/store", id)), 1);
        assert_eq!(connector.connects_to(&format!("mysql://{}-master:3306/store", id)), 1);
    }

    #[tokio::test]
    async fn test_removed_shard_releases_connections() {
        let (cluster, _) = store_cluster();
        let b = cluster.shard(&ShardId::new("B")).unwrap();
        b.query_uuid().await.unwrap();
        assert_eq!(b.open_connections(), 1);

        cluster.remove_shard(&ShardId::new("B")).unwrap();

        assert_eq!(b.open_connections(), 0);
        assert!(b.query_uuid().await.is_err());
    }
}
