//! # Domain Entities
//!
//! The topology model: shards and the mapping that lists them.

use super::errors::{ShardingError, ShardingResult};
use super::invariants::{invariant_node_roles, invariant_non_empty_id, invariant_unique_shard_ids};
use super::value_objects::{NodeDescriptor, ShardId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One logical shard: a master and its ordered replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    /// Shard identifier.
    pub id: ShardId,
    /// Write node.
    pub master: NodeDescriptor,
    /// Read replicas in configuration order.
    #[serde(default)]
    pub replicas: Vec<NodeDescriptor>,
}

impl ShardSpec {
    /// Shard with a master and no replicas.
    pub fn new(id: impl Into<ShardId>, master: NodeDescriptor) -> Self {
        Self {
            id: id.into(),
            master,
            replicas: Vec::new(),
        }
    }

    /// Append a replica.
    pub fn with_replica(mut self, replica: NodeDescriptor) -> Self {
        self.replicas.push(replica);
        self
    }

    /// Check role and id rules for this shard alone.
    pub fn validate(&self) -> ShardingResult<()> {
        invariant_non_empty_id(&self.id)?;
        invariant_node_roles(self)
    }
}

/// Serialized form of [`ShardMapping`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct MappingDocument {
    #[serde(default)]
    shards: Vec<ShardSpec>,
}

/// `ShardId -> master + replicas`, in declaration order.
///
/// Constructed only through validating paths, so a `ShardMapping` value
/// never holds duplicate ids or mislabelled nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MappingDocument", into = "MappingDocument")]
pub struct ShardMapping {
    shards: Vec<ShardSpec>,
}

impl ShardMapping {
    /// Build a mapping, rejecting duplicate ids and role mismatches.
    pub fn new(shards: Vec<ShardSpec>) -> ShardingResult<Self> {
        let mapping = Self { shards };
        mapping.validate()?;
        Ok(mapping)
    }

    /// Mapping with zero shards.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Re-check every invariant.
    pub fn validate(&self) -> ShardingResult<()> {
        for spec in &self.shards {
            spec.validate()?;
        }
        invariant_unique_shard_ids(&self.shards)
    }

    /// Spec for a shard.
    pub fn get(&self, id: &ShardId) -> Option<&ShardSpec> {
        self.shards.iter().find(|s| &s.id == id)
    }

    /// Whether a shard is listed.
    pub fn contains(&self, id: &ShardId) -> bool {
        self.get(id).is_some()
    }

    /// Shard ids in declaration order.
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.iter().map(|s| s.id.clone()).collect()
    }

    /// Iterate specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ShardSpec> {
        self.shards.iter()
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// True when no shards are listed.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// New mapping with `spec` inserted, or replacing the entry with the same id
    /// in place.
    pub fn with_shard(&self, spec: ShardSpec) -> ShardingResult<Self> {
        spec.validate()?;
        let mut shards = self.shards.clone();
        match shards.iter_mut().find(|s| s.id == spec.id) {
            Some(existing) => *existing = spec,
            None => shards.push(spec),
        }
        Ok(Self { shards })
    }

    /// New mapping without `id`. Unknown ids are an error.
    pub fn without_shard(&self, id: &ShardId) -> ShardingResult<Self> {
        if !self.contains(id) {
            return Err(ShardingError::ShardNotFound(id.clone()));
        }
        let shards = self.shards.iter().filter(|s| &s.id != id).cloned().collect();
        Ok(Self { shards })
    }

    /// Same shard set with the same node assignments, ignoring shard order.
    pub fn equivalent(&self, other: &ShardMapping) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let theirs: HashMap<&ShardId, &ShardSpec> =
            other.shards.iter().map(|s| (&s.id, s)).collect();
        self.shards
            .iter()
            .all(|s| theirs.get(&s.id).is_some_and(|o| *o == s))
    }
}

impl TryFrom<MappingDocument> for ShardMapping {
    type Error = ShardingError;

    fn try_from(doc: MappingDocument) -> Result<Self, Self::Error> {
        Self::new(doc.shards)
    }
}

impl From<ShardMapping> for MappingDocument {
    fn from(mapping: ShardMapping) -> Self {
        Self {
            shards: mapping.shards,
        }
    }
}
