//! # Topology Sources
//!
//! A topology written to a source and read back must describe the same
//! shards, and a cluster reloaded from a source must route by it.

#[cfg(test)]
mod tests {
    use crate::common::{init_test_tracing, mapping, shard_spec};
    use shardline_routing::{
        DocumentStoreSource, FileSource, InMemoryDocumentStore, MockConnector, ShardCluster,
        ShardId, ShardingConfig, ShardingError, TopologySource,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_document_store_round_trip() {
        init_test_tracing();
        let store = Arc::new(InMemoryDocumentStore::new());
        let source = DocumentStoreSource::new(store, "store-app");
        let original = mapping(&["s1", "s2", "s3"], 2);

        source.write(&original, 0).await.unwrap();
        let loaded = source.load().await.unwrap();

        assert!(loaded.equivalent(&original));
        let s2 = loaded.get(&ShardId::new("s2")).unwrap();
        assert_eq!(s2.replicas.len(), 2);
        assert_eq!(s2.master.password.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("shards.toml"));
        let original = mapping(&["s1", "s2", "s3"], 2);

        source.write(&original).await.unwrap();
        assert!(source.load().await.unwrap().equivalent(&original));
    }

    #[tokio::test]
    async fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("shards.json"));
        let original = mapping(&["s1", "s2"], 1);

        source.write(&original).await.unwrap();
        assert!(source.load().await.unwrap().equivalent(&original));
    }

    #[tokio::test]
    async fn test_cluster_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shards.toml");
        std::fs::write(
            &path,
            r#"
            [[shards]]
            id = "eu"
            master = { dsn = "mysql://eu-master:3306/store", role = "master" }

            [[shards]]
            id = "us"
            master = { dsn = "mysql://us-master:3306/store", role = "master" }
            replicas = [{ dsn = "mysql://us-replica:3306/store", role = "replica" }]
            "#,
        )
        .unwrap();

        let cluster = ShardCluster::from_source(
            &FileSource::new(&path),
            ShardingConfig::for_testing(),
            Arc::new(MockConnector::new()),
        )
        .await
        .unwrap();

        assert_eq!(cluster.mapping().len(), 2);
        let shard = cluster.dispatch("TW001").unwrap();
        assert!(["eu", "us"].contains(&shard.id().as_str()));
    }

    #[tokio::test]
    async fn test_reload_follows_document_store() {
        init_test_tracing();
        let store = Arc::new(InMemoryDocumentStore::new());
        let source = DocumentStoreSource::new(store, "store-app");
        source.write(&mapping(&["s1", "s2"], 0), 0).await.unwrap();

        let connector = Arc::new(MockConnector::new());
        let cluster = ShardCluster::from_source(&source, ShardingConfig::for_testing(), connector)
            .await
            .unwrap();
        let s1_before = cluster.shard(&ShardId::new("s1")).unwrap();

        let (current, version) = source.load_versioned().await.unwrap();
        let next = current.with_shard(shard_spec("s3", 1)).unwrap();
        source.write(&next, version).await.unwrap();

        let change = cluster.reload(&source).await.unwrap();
        assert_eq!(change.added, vec![ShardId::new("s3")]);
        assert!(change.removed.is_empty());
        assert!(change.updated.is_empty());

        // Unchanged shards keep their runtime objects
        let s1_after = cluster.shard(&ShardId::new("s1")).unwrap();
        assert!(Arc::ptr_eq(&s1_before, &s1_after));
    }

    #[tokio::test]
    async fn test_concurrent_writers_conflict() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let admin_a = DocumentStoreSource::new(store.clone(), "store-app");
        let admin_b = DocumentStoreSource::new(store, "store-app");
        admin_a.write(&mapping(&["s1"], 0), 0).await.unwrap();

        let (base_a, version_a) = admin_a.load_versioned().await.unwrap();
        let (base_b, version_b) = admin_b.load_versioned().await.unwrap();

        admin_a
            .write(&base_a.with_shard(shard_spec("s2", 0)).unwrap(), version_a)
            .await
            .unwrap();
        let lost = admin_b
            .write(&base_b.with_shard(shard_spec("s3", 0)).unwrap(), version_b)
            .await;

        assert!(matches!(
            lost,
            Err(ShardingError::TopologyConflict { expected: 1, actual: 2 })
        ));
        let stored = admin_b.load().await.unwrap();
        assert!(stored.contains(&ShardId::new("s2")));
        assert!(!stored.contains(&ShardId::new("s3")));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_topology() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let source = DocumentStoreSource::new(store.clone(), "store-app");
        source.write(&mapping(&["s1", "s2"], 0), 0).await.unwrap();

        let cluster = ShardCluster::from_source(
            &source,
            ShardingConfig::for_testing(),
            Arc::new(MockConnector::new()),
        )
        .await
        .unwrap();
        let epoch = cluster.epoch();

        store.set_unavailable(true);
        assert!(matches!(
            cluster.reload(&source).await,
            Err(ShardingError::ConfigLoad { .. })
        ));
        assert_eq!(cluster.epoch(), epoch);
        assert_eq!(cluster.mapping().len(), 2);
    }
}
