//! # Shardline Dispatch Benchmarks
//!
//! | Operation | Expected cost |
//! |-----------|---------------|
//! | Ring build | O(S·V log(S·V)) |
//! | Ring lookup | O(log(S·V)) |
//! | Cluster dispatch | ring lookup + one map lookup |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shardline_routing::{
    HashRing, Hasher, MockConnector, NodeDescriptor, ShardCluster, ShardKey, ShardMapping,
    ShardSpec, ShardingConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn mapping(shards: usize) -> ShardMapping {
    ShardMapping::new(
        (0..shards)
            .map(|i| {
                ShardSpec::new(
                    format!("shard-{}", i),
                    NodeDescriptor::master(format!("mysql://db{}:3306/app", i)),
                )
            })
            .collect(),
    )
    .expect("benchmark mapping is valid")
}

// ============================================================================
// Ring construction
// ============================================================================

fn bench_ring_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring-build");
    group.measurement_time(Duration::from_secs(5));

    for shards in [4, 16, 64] {
        let mapping = mapping(shards);
        group.bench_with_input(BenchmarkId::new("vnodes_64", shards), &mapping, |b, m| {
            b.iter(|| black_box(HashRing::build(m, 64)))
        });
    }

    group.finish();
}

// ============================================================================
// Lookup
// ============================================================================

fn bench_ring_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring-lookup");

    let keys: Vec<ShardKey> = (0..1000u64).map(ShardKey::from).collect();
    for shards in [4, 16, 64] {
        let ring = HashRing::build(&mapping(shards), 64);
        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::new("keys_1000", shards), &ring, |b, ring| {
            b.iter(|| {
                for key in &keys {
                    black_box(ring.dispatch(key).ok());
                }
            })
        });
    }

    group.finish();
}

fn bench_cluster_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster-dispatch");

    let cluster = ShardCluster::new(
        mapping(16),
        ShardingConfig::default(),
        Arc::new(MockConnector::new()),
    )
    .expect("benchmark cluster builds");

    group.bench_function("string_key", |b| {
        b.iter(|| black_box(cluster.dispatch(black_box("TW001")).ok()))
    });
    group.bench_function("integer_key", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(cluster.dispatch(i).ok())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_ring_build, bench_ring_lookup, bench_cluster_dispatch);
criterion_main!(benches);
