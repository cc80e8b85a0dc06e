//! # Adapters Layer (Hexagonal Architecture)
//!
//! Topology sources and the in-process document store.

mod document_store;
mod file_source;

pub use document_store::{DocumentStoreSource, InMemoryDocumentStore, TOPOLOGY_DOCUMENT_PREFIX};
pub use file_source::{FileFormat, FileSource};
