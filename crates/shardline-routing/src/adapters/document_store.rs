//! Document Store Topology Source
//!
//! Topology kept as one JSON document per application in a shared document
//! store. Writers use optimistic versioning: a write names the version it
//! was based on and fails with [`ShardingError::TopologyConflict`] if
//! another writer got there first.

use crate::domain::{ConnectionError, ShardMapping, ShardingError, ShardingResult};
use crate::ports::{DocumentStore, PutOutcome, TopologySource, VersionedDocument};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Prefix of every topology document id.
pub const TOPOLOGY_DOCUMENT_PREFIX: &str = "shardline/topology/";

/// Topology for one application id.
#[derive(Clone)]
pub struct DocumentStoreSource {
    store: Arc<dyn DocumentStore>,
    app_id: String,
}

impl DocumentStoreSource {
    /// Source reading the topology of `app_id` from `store`.
    pub fn new(store: Arc<dyn DocumentStore>, app_id: impl Into<String>) -> Self {
        Self {
            store,
            app_id: app_id.into(),
        }
    }

    /// Application id.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Id of the backing document.
    pub fn document_id(&self) -> String {
        format!("{}{}", TOPOLOGY_DOCUMENT_PREFIX, self.app_id)
    }

    /// Load the mapping together with the version it was stored under.
    pub async fn load_versioned(&self) -> ShardingResult<(ShardMapping, u64)> {
        let id = self.document_id();
        let document = self
            .store
            .get(&id)
            .await
            .map_err(|e| ShardingError::config(&id, e))?
            .ok_or_else(|| ShardingError::config(&id, "no topology document"))?;

        let mapping: ShardMapping =
            serde_json::from_value(document.body).map_err(|e| ShardingError::config(&id, e))?;
        Ok((mapping, document.version))
    }

    /// Store `mapping` if the stored version is still `expected_version`
    /// (0 for a first write). Returns the new version.
    pub async fn write(&self, mapping: &ShardMapping, expected_version: u64) -> ShardingResult<u64> {
        let id = self.document_id();
        mapping.validate()?;
        let body = serde_json::to_value(mapping).map_err(|e| ShardingError::config(&id, e))?;

        let outcome = self
            .store
            .put_if_version(&id, expected_version, body)
            .await
            .map_err(|source| ShardingError::TopologyStore {
                document: id.clone(),
                source,
            })?;

        match outcome {
            PutOutcome::Written { version } => {
                info!(document = %id, version, shards = mapping.len(), "Topology written");
                Ok(version)
            }
            PutOutcome::Conflict { actual } => {
                warn!(document = %id, expected = expected_version, actual, "Topology write lost the race");
                Err(ShardingError::TopologyConflict {
                    expected: expected_version,
                    actual,
                })
            }
        }
    }

    /// Delete the topology document. Returns whether it existed.
    pub async fn remove(&self) -> ShardingResult<bool> {
        let id = self.document_id();
        self.store
            .delete(&id)
            .await
            .map_err(|source| ShardingError::TopologyStore { document: id, source })
    }
}

#[async_trait]
impl TopologySource for DocumentStoreSource {
    async fn load(&self) -> ShardingResult<ShardMapping> {
        let (mapping, version) = self.load_versioned().await?;
        info!(document = %self.document_id(), version, shards = mapping.len(), "Loaded topology document");
        Ok(mapping)
    }

    fn describe(&self) -> String {
        self.document_id()
    }
}

impl std::fmt::Debug for DocumentStoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreSource")
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Process-local [`DocumentStore`].
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, VersionedDocument>>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Make every call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ConnectionError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ConnectionError::Refused("document store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &str) -> Result<Option<VersionedDocument>, ConnectionError> {
        self.check_available()?;
        Ok(self.documents.read().get(id).cloned())
    }

    async fn put_if_version(
        &self,
        id: &str,
        expected_version: u64,
        body: serde_json::Value,
    ) -> Result<PutOutcome, ConnectionError> {
        self.check_available()?;
        let mut documents = self.documents.write();
        let actual = documents.get(id).map(|d| d.version).unwrap_or(0);
        if actual != expected_version {
            return Ok(PutOutcome::Conflict { actual });
        }

        let version = actual + 1;
        documents.insert(id.to_string(), VersionedDocument { version, body });
        Ok(PutOutcome::Written { version })
    }

    async fn delete(&self, id: &str) -> Result<bool, ConnectionError> {
        self.check_available()?;
        Ok(self.documents.write().remove(id).is_some())
    }
}
