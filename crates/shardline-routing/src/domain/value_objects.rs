//! # Domain Value Objects
//!
//! Immutable value types for shard routing.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque shard identifier, stable for the lifetime of a shard.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    /// Create a shard id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ShardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ShardId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Role of a physical node inside its shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Accepts writes; source of truth.
    Master,
    /// Read-only copy of the master.
    Replica,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Replica => f.write_str("replica"),
        }
    }
}

/// Connection parameters for one physical data source.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Driver DSN or `host:port` address.
    pub dsn: String,
    /// Login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Login password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Master or replica.
    pub role: NodeRole,
    /// Driver-specific options, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl NodeDescriptor {
    /// Master node with no credentials.
    pub fn master(dsn: impl Into<String>) -> Self {
        Self::with_role(dsn, NodeRole::Master)
    }

    /// Replica node with no credentials.
    pub fn replica(dsn: impl Into<String>) -> Self {
        Self::with_role(dsn, NodeRole::Replica)
    }

    fn with_role(dsn: impl Into<String>, role: NodeRole) -> Self {
        Self {
            dsn: dsn.into(),
            user: None,
            password: None,
            role,
            options: BTreeMap::new(),
        }
    }

    /// Attach credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Attach a driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

// Passwords never reach logs.
impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("dsn", &self.dsn)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("role", &self.role)
            .field("options", &self.options)
            .finish()
    }
}

/// A shard key: the value used to decide which shard owns a record.
///
/// Integers are hashed through their decimal form, so `ShardKey::from(42)`
/// and `ShardKey::from("42")` route to the same shard.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShardKey {
    /// Raw bytes (binary UUIDs, composite keys).
    Bytes(Vec<u8>),
    /// Integer key such as an autoincrement store id.
    Int(i128),
    /// Text key such as a store code.
    Str(String),
}

impl ShardKey {
    /// Bytes fed into the ring hash.
    pub fn hash_input(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Bytes(b) => Cow::Borrowed(b.as_slice()),
            Self::Int(i) => Cow::Owned(i.to_string().into_bytes()),
            Self::Str(s) => Cow::Borrowed(s.as_bytes()),
        }
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ShardKey {
    fn from(key: &str) -> Self {
        Self::Str(key.to_string())
    }
}

impl From<String> for ShardKey {
    fn from(key: String) -> Self {
        Self::Str(key)
    }
}

impl From<&String> for ShardKey {
    fn from(key: &String) -> Self {
        Self::Str(key.clone())
    }
}

impl From<&[u8]> for ShardKey {
    fn from(key: &[u8]) -> Self {
        Self::Bytes(key.to_vec())
    }
}

impl From<Vec<u8>> for ShardKey {
    fn from(key: Vec<u8>) -> Self {
        Self::Bytes(key)
    }
}

impl From<Uuid> for ShardKey {
    fn from(key: Uuid) -> Self {
        Self::Bytes(key.as_bytes().to_vec())
    }
}

macro_rules! int_shard_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ShardKey {
                fn from(key: $t) -> Self {
                    Self::Int(i128::from(key))
                }
            }
        )*
    };
}

int_shard_key!(i32, u32, i64, u64);

/// Read routing strategy, fixed when a shard is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Every read goes to the master.
    AlwaysMaster,
    /// Pick a replica uniformly at random.
    RandomReplica,
    /// Cycle through replicas in configuration order.
    #[default]
    RoundRobinReplica,
}

/// Per-call read override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPreference {
    /// Follow the shard's [`ReadPolicy`].
    #[default]
    Policy,
    /// Read from the master (read-your-writes).
    ForceMaster,
}

/// Which node a read or write was routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSelection {
    /// The shard master.
    Master,
    /// Replica at this index in configuration order.
    Replica(usize),
}

/// Hash function family and layout used to place ring positions.
///
/// Bumping this is a routing-breaking change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashVersion {
    /// CRC-32 (IEEE) over the key bytes, and over `"{shard}#{index}"` for
    /// virtual nodes.
    #[default]
    Crc32V1,
}
