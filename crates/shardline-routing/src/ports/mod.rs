//! # Ports
//!
//! Inbound seams (hashers, repositories) and outbound dependencies
//! (connections, document store, topology sources).

pub mod inbound;
pub mod outbound;

pub use inbound::{Hasher, ShardRepository};
pub use outbound::{
    Connection, Connector, DocumentStore, MockConnection, MockConnector, PutOutcome,
    TopologySource, VersionedDocument,
};
