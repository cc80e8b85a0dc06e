//! File Topology Source
//!
//! Loads a [`ShardMapping`] from a local TOML or JSON file.
//!
//! # File Format
//!
//! ```toml
//! [[shards]]
//! id = "s1"
//! master = { dsn = "mysql://10.0.0.1:3306/app", user = "app", password = "secret", role = "master" }
//! replicas = [
//!     { dsn = "mysql://10.0.0.2:3306/app", role = "replica" },
//! ]
//!
//! [[shards]]
//! id = "s2"
//! master = { dsn = "mysql://10.0.1.1:3306/app", role = "master" }
//! ```

use crate::domain::{ShardMapping, ShardingError, ShardingResult};
use crate::ports::TopologySource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported file encodings, chosen by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl FileFormat {
    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> ShardingResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            other => Err(ShardingError::config(
                path.display().to_string(),
                format!("unsupported topology file extension {:?}", other),
            )),
        }
    }
}

/// Topology stored in a local file.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Source backed by `path`. Nothing is read until [`TopologySource::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a TOML topology document.
    pub fn parse_toml(content: &str) -> ShardingResult<ShardMapping> {
        toml::from_str(content).map_err(|e| ShardingError::config("toml topology", e))
    }

    /// Parse a JSON topology document.
    pub fn parse_json(content: &str) -> ShardingResult<ShardMapping> {
        serde_json::from_str(content).map_err(|e| ShardingError::config("json topology", e))
    }

    /// Write `mapping` to the file in the format its extension names.
    pub async fn write(&self, mapping: &ShardMapping) -> ShardingResult<()> {
        let origin = self.describe();
        let content = match FileFormat::from_path(&self.path)? {
            FileFormat::Toml => toml::to_string_pretty(mapping).map_err(|e| ShardingError::config(&origin, e))?,
            FileFormat::Json => {
                serde_json::to_string_pretty(mapping).map_err(|e| ShardingError::config(&origin, e))?
            }
        };
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ShardingError::config(&origin, e))
    }
}

#[async_trait]
impl TopologySource for FileSource {
    async fn load(&self) -> ShardingResult<ShardMapping> {
        let origin = self.describe();
        let format = FileFormat::from_path(&self.path)?;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ShardingError::config(&origin, e))?;

        let parsed = match format {
            FileFormat::Toml => Self::parse_toml(&content),
            FileFormat::Json => Self::parse_json(&content),
        };
        let mapping = parsed.map_err(|e| match e {
            ShardingError::ConfigLoad { reason, .. } => ShardingError::ConfigLoad {
                source_name: origin.clone(),
                reason,
            },
            other => other,
        })?;

        info!(source = %origin, shards = mapping.len(), "Loaded topology file");
        Ok(mapping)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
