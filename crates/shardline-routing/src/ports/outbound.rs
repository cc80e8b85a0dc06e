//! # Outbound Ports
//!
//! Traits for external collaborators: the connection layer, the document
//! store that persists topology, and topology sources.

use crate::domain::{ConnectionError, NodeDescriptor, ShardMapping, ShardingResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// An open connection to one physical node.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Ask the node for a fresh 128-bit UUID.
    async fn generate_uuid(&mut self) -> Result<Uuid, ConnectionError>;

    /// Whether the connection can be handed out again.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Access the driver's concrete connection type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Opens connections. Owned by the external driver layer.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `node`.
    async fn connect(&self, node: &NodeDescriptor) -> Result<Box<dyn Connection>, ConnectionError>;
}

/// A JSON document plus its store-assigned version.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedDocument {
    /// Monotonic version, starting at 1 for the first write.
    pub version: u64,
    /// Document body.
    pub body: serde_json::Value,
}

/// Result of a conditional write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// Stored; the document now has `version`.
    Written {
        /// New version.
        version: u64,
    },
    /// The stored version did not match the expected one.
    Conflict {
        /// Version currently stored (0 when absent).
        actual: u64,
    },
}

/// Distributed document store holding topology documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document.
    async fn get(&self, id: &str) -> Result<Option<VersionedDocument>, ConnectionError>;

    /// Write `body` only if the stored version equals `expected_version`
    /// (0 means "must not exist yet").
    async fn put_if_version(
        &self,
        id: &str,
        expected_version: u64,
        body: serde_json::Value,
    ) -> Result<PutOutcome, ConnectionError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, ConnectionError>;
}

/// Where a topology comes from. The core only sees the resulting mapping.
#[async_trait]
pub trait TopologySource: Send + Sync {
    /// Load and validate the mapping.
    async fn load(&self) -> ShardingResult<ShardMapping>;

    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock connector that hands out in-process connections.
#[derive(Default)]
pub struct MockConnector {
    connects: AtomicUsize,
    per_node: Mutex<HashMap<String, usize>>,
    fail_connect: AtomicBool,
    fail_uuid: Arc<AtomicBool>,
    nil_uuid: Arc<AtomicBool>,
    connect_delay: Mutex<Option<Duration>>,
    uuid_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockConnector {
    /// Create a connector that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total connections opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Connections opened to a node.
    pub fn connects_to(&self, dsn: &str) -> usize {
        self.per_node.lock().get(dsn).copied().unwrap_or(0)
    }

    /// Make every subsequent connect fail with `Refused`.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make `generate_uuid` fail on every connection.
    pub fn set_fail_uuid(&self, fail: bool) {
        self.fail_uuid.store(fail, Ordering::SeqCst);
    }

    /// Make `generate_uuid` return the nil UUID.
    pub fn set_nil_uuid(&self, nil: bool) {
        self.nil_uuid.store(nil, Ordering::SeqCst);
    }

    /// Sleep this long inside every connect.
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        *self.connect_delay.lock() = delay;
    }

    /// Sleep this long inside every `generate_uuid`, on existing
    /// connections too.
    pub fn set_uuid_delay(&self, delay: Option<Duration>) {
        *self.uuid_delay.lock() = delay;
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, node: &NodeDescriptor) -> Result<Box<dyn Connection>, ConnectionError> {
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Refused(node.dsn.clone()));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.per_node.lock().entry(node.dsn.clone()).or_default() += 1;

        Ok(Box::new(MockConnection {
            dsn: node.dsn.clone(),
            healthy: true,
            fail_uuid: Arc::clone(&self.fail_uuid),
            nil_uuid: Arc::clone(&self.nil_uuid),
            uuid_delay: Arc::clone(&self.uuid_delay),
        }))
    }
}

/// Connection produced by [`MockConnector`].
pub struct MockConnection {
    /// Node this connection points at.
    pub dsn: String,
    /// Flip to false to simulate a broken connection.
    pub healthy: bool,
    fail_uuid: Arc<AtomicBool>,
    nil_uuid: Arc<AtomicBool>,
    uuid_delay: Arc<Mutex<Option<Duration>>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn generate_uuid(&mut self) -> Result<Uuid, ConnectionError> {
        let delay = *self.uuid_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uuid.load(Ordering::SeqCst) {
            return Err(ConnectionError::Other(format!("{}: UUID() unsupported", self.dsn)));
        }
        if self.nil_uuid.load(Ordering::SeqCst) {
            return Ok(Uuid::nil());
        }
        Ok(Uuid::new_v4())
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
