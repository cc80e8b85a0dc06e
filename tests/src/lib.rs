//! # Shardline Test Suite
//!
//! Unified test crate for behavior that spans more than one module of
//! `shardline-routing`.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── common.rs          # Tracing setup, topology fixtures, sample repository
//! └── integration/
//!     ├── routing.rs     # Determinism, minimal disruption, empty topology
//!     ├── uuids.rs       # queryUUID uniqueness and lazy connections
//!     ├── topology.rs    # File and document-store round trips, reloads
//!     ├── store_app.rs   # Store/order walkthrough with a tiny ring
//!     └── concurrency.rs # Dispatch while the topology changes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p shardline-tests
//!
//! # By category
//! cargo test -p shardline-tests integration::routing::
//!
//! # Benchmarks
//! cargo bench -p shardline-tests
//! ```

#![allow(dead_code)]

pub mod common;
pub mod integration;
