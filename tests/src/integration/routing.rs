//! # Routing Properties
//!
//! Placement must be a pure function of (key, shard set, virtual nodes) and
//! must move as few keys as possible when the shard set changes.

#[cfg(test)]
mod tests {
    use crate::common::{init_test_tracing, mapping};
    use shardline_routing::{
        HashRing, Hasher, MockConnector, ShardCluster, ShardId, ShardKey, ShardingConfig,
        ShardingError,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    fn cluster(ids: &[&str], virtual_nodes: usize) -> ShardCluster {
        let config = ShardingConfig {
            virtual_nodes_per_shard: virtual_nodes,
            ..ShardingConfig::for_testing()
        };
        ShardCluster::new(mapping(ids, 0), config, Arc::new(MockConnector::new())).unwrap()
    }

    // =========================================================================
    // DETERMINISM
    // =========================================================================

    #[test]
    fn test_repeated_dispatch_is_stable() {
        init_test_tracing();
        let cluster = cluster(&["a", "b", "c"], 64);
        let first = cluster.dispatch("TW001").unwrap().id().clone();

        for _ in 0..1000 {
            assert_eq!(cluster.dispatch("TW001").unwrap().id(), &first);
        }
    }

    #[test]
    fn test_independent_rings_agree() {
        let one = HashRing::build(&mapping(&["a", "b", "c"], 0), 64);
        let two = HashRing::build(&mapping(&["c", "a", "b"], 2), 64);

        for i in 0..5000u64 {
            let key = ShardKey::from(i);
            assert_eq!(one.dispatch(&key).unwrap(), two.dispatch(&key).unwrap());
        }
    }

    #[test]
    fn test_integer_and_string_keys_agree() {
        let ring = HashRing::build(&mapping(&["a", "b", "c"], 0), 64);
        for i in 0..500u64 {
            assert_eq!(
                ring.dispatch(&ShardKey::from(i)).unwrap(),
                ring.dispatch(&ShardKey::from(i.to_string())).unwrap()
            );
        }
    }

    // =========================================================================
    // MINIMAL DISRUPTION
    // =========================================================================

    #[test]
    fn test_removing_a_shard_only_moves_its_keys() {
        init_test_tracing();
        let cluster = cluster(&["A", "B", "C"], 64);
        let keys: Vec<String> = (0..10_000).map(|i| format!("store-{}", i)).collect();

        let before: HashMap<&str, ShardId> = keys
            .iter()
            .map(|k| (k.as_str(), cluster.dispatch(k.as_str()).unwrap().id().clone()))
            .collect();

        cluster.remove_shard(&ShardId::new("C")).unwrap();

        let mut moved = 0;
        for key in &keys {
            let after = cluster.dispatch(key.as_str()).unwrap().id().clone();
            let was = &before[key.as_str()];
            if was.as_str() == "C" {
                assert_ne!(after.as_str(), "C");
                moved += 1;
            } else {
                assert_eq!(&after, was, "key {} moved off a surviving shard", key);
            }
        }
        assert!(moved > 0);
    }

    #[test]
    fn test_adding_a_shard_moves_about_one_share() {
        let cluster = cluster(&["A", "B", "C"], 64);
        let keys: Vec<u64> = (0..10_000).collect();
        let before: Vec<ShardId> = keys
            .iter()
            .map(|k| cluster.dispatch(*k).unwrap().id().clone())
            .collect();

        cluster.add_shard(crate::common::shard_spec("D", 0)).unwrap();

        let moved = keys
            .iter()
            .zip(&before)
            .filter(|(k, was)| cluster.dispatch(**k).unwrap().id() != *was)
            .count();
        // Expected share is 1/4; allow generous variance for a 64-vnode ring
        assert!(moved > 1000 && moved < 4000, "moved {} keys", moved);
        for (k, was) in keys.iter().zip(&before) {
            let now = cluster.dispatch(*k).unwrap().id().clone();
            assert!(now == *was || now.as_str() == "D");
        }
    }

    // =========================================================================
    // EMPTY TOPOLOGY
    // =========================================================================

    #[test]
    fn test_empty_topology_has_no_shards() {
        let cluster = cluster(&[], 64);
        for key in ["TW001", "0", ""] {
            assert!(matches!(
                cluster.dispatch(key),
                Err(ShardingError::NoShardsAvailable { .. })
            ));
        }
    }

    #[test]
    fn test_single_shard_takes_everything() {
        let cluster = cluster(&["only"], 1);
        for i in 0..1000u64 {
            assert_eq!(cluster.dispatch(i).unwrap().id().as_str(), "only");
        }
    }
}
