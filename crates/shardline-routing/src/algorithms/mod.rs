//! # Algorithms Module
//!
//! Key placement algorithms for shard routing.

pub mod hash_ring;

pub use hash_ring::{hash_key, virtual_node_position, HashRing, RingEntry};
