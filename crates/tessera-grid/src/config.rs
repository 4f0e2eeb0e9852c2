//! Grid configuration.

use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Grid`](crate::Grid).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Members started with the grid.
    pub nodes: usize,
    /// Copies kept of every key, clamped to the cluster size.
    pub owners: usize,
    /// How long a write waits for a busy key.
    pub lock_timeout_ms: u64,
    /// Keep invalidate-on-write copies of remote entries on non-owners.
    pub near_cache: bool,
    /// Lock-striped shards per member store.
    pub shards: usize,
    /// Seed for owner selection and shard hashing.
    pub hash_seed: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nodes: 1,
            owners: 2,
            lock_timeout_ms: 10_000,
            near_cache: false,
            shards: 16,
            hash_seed: 0,
        }
    }
}

impl GridConfig {
    pub fn builder() -> GridConfigBuilder {
        GridConfigBuilder::new()
    }

    /// Loads a configuration document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GridConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(GridError::InvalidConfig("nodes must be at least 1".into()));
        }
        if self.owners == 0 {
            return Err(GridError::InvalidConfig("owners must be at least 1".into()));
        }
        if self.shards == 0 {
            return Err(GridError::InvalidConfig("shards must be at least 1".into()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub(crate) fn owners_for(&self, members: usize) -> usize {
        self.owners.clamp(1, members.max(1))
    }
}

/// Builder for grid configuration.
pub struct GridConfigBuilder {
    config: GridConfig,
}

impl GridConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GridConfig::default(),
        }
    }

    pub fn nodes(mut self, nodes: usize) -> Self {
        self.config.nodes = nodes;
        self
    }

    pub fn owners(mut self, owners: usize) -> Self {
        self.config.owners = owners;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn near_cache(mut self, enabled: bool) -> Self {
        self.config.near_cache = enabled;
        self
    }

    pub fn shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    pub fn hash_seed(mut self, seed: u64) -> Self {
        self.config.hash_seed = seed;
        self
    }

    pub fn build(self) -> GridConfig {
        self.config
    }
}

impl Default for GridConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.nodes, 1);
        assert_eq!(config.owners, 2);
        assert_eq!(config.lock_timeout(), Duration::from_secs(10));
        assert!(!config.near_cache);
    }

    #[test]
    fn test_builder() {
        let config = GridConfig::builder()
            .nodes(4)
            .owners(3)
            .lock_timeout(Duration::from_millis(250))
            .near_cache(true)
            .shards(4)
            .hash_seed(42)
            .build();
        assert_eq!(config.nodes, 4);
        assert_eq!(config.owners, 3);
        assert_eq!(config.lock_timeout_ms, 250);
        assert!(config.near_cache);
        assert_eq!(config.hash_seed, 42);
    }

    #[test]
    fn test_owners_clamped_to_members() {
        let config = GridConfig::builder().owners(3).build();
        assert_eq!(config.owners_for(1), 1);
        assert_eq!(config.owners_for(2), 2);
        assert_eq!(config.owners_for(5), 3);
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = GridConfig::from_json(r#"{"nodes": 3, "near_cache": true}"#).unwrap();
        assert_eq!(config.nodes, 3);
        assert!(config.near_cache);
        assert_eq!(config.owners, 2);
        assert_eq!(config.shards, 16);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            GridConfig::from_json(r#"{"nodes": 0}"#),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(matches!(
            GridConfig::from_json("not json"),
            Err(GridError::Codec(_))
        ));
    }
}
