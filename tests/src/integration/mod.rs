//! # Integration Tests
//!
//! Cluster-level flows driven through the public API only.

pub mod routing;
pub mod store_app;
pub mod topology;
