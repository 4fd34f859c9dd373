//! WolfKV Configuration
//!
//! This module provides configuration structures for a WolfKV
//! leader process and its follower replicas.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main WolfKV configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfKvConfig {
    /// Node-specific configuration
    pub node: NodeConfig,

    /// Write-Ahead Log configuration
    #[serde(default)]
    pub wal: WalConfig,

    /// Replication configuration
    #[serde(default)]
    pub replication: ReplicationSettings,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    pub id: String,

    /// Data directory for the WAL
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Write-Ahead Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalConfig {
    /// WAL file name inside the data directory
    #[serde(default = "default_wal_file")]
    pub file_name: String,

    /// Use fsync for durability (slower but safer)
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

/// Replication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationSettings {
    /// How long a quorum write waits for acknowledgments
    #[serde(default = "default_quorum_timeout_ms")]
    pub quorum_timeout_ms: u64,

    /// Write quorum used when a request does not name one
    #[serde(default = "default_write_quorum")]
    pub default_write_quorum: usize,

    /// Follower replicas, in ordinal order
    #[serde(default)]
    pub followers: Vec<FollowerConfig>,
}

/// A single follower replica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerConfig {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Propagation delay of the link to this follower
    #[serde(default)]
    pub delay_ms: u64,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Enable HTTP API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP API bind address
    #[serde(default = "default_api_address")]
    pub bind_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/wolfkv")
}

fn default_wal_file() -> String {
    "wolfkv.wal".to_string()
}

fn default_fsync() -> bool {
    true
}

fn default_quorum_timeout_ms() -> u64 {
    2000
}

fn default_write_quorum() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_api_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            file_name: default_wal_file(),
            fsync: default_fsync(),
        }
    }
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            quorum_timeout_ms: default_quorum_timeout_ms(),
            default_write_quorum: default_write_quorum(),
            followers: Vec::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_api_address(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WolfKvConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfKvConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.id.is_empty() {
            return Err(crate::Error::Config("node.id cannot be empty".into()));
        }

        if self.wal.file_name.is_empty() {
            return Err(crate::Error::Config("wal.file_name cannot be empty".into()));
        }

        if self.replication.quorum_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "replication.quorum_timeout_ms must be greater than zero".into(),
            ));
        }

        let max = self.max_write_quorum();
        let w = self.replication.default_write_quorum;
        if w == 0 || w > max {
            return Err(crate::Error::Config(format!(
                "replication.default_write_quorum must be between 1 and {} (got {})",
                max, w
            )));
        }

        if self.api.enabled && self.api.bind_address.parse::<SocketAddr>().is_err() {
            return Err(crate::Error::Config(format!(
                "api.bind_address is not a socket address: {}",
                self.api.bind_address
            )));
        }

        Ok(())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &PathBuf {
        &self.node.data_dir
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> PathBuf {
        self.node.data_dir.join(&self.wal.file_name)
    }

    /// Get quorum timeout as Duration
    pub fn quorum_timeout(&self) -> Duration {
        Duration::from_millis(self.replication.quorum_timeout_ms)
    }

    /// Number of configured followers
    pub fn follower_count(&self) -> usize {
        self.replication.followers.len()
    }

    /// Largest write quorum the replica set can satisfy (leader + followers)
    pub fn max_write_quorum(&self) -> usize {
        1 + self.follower_count()
    }

    /// Link delays in follower ordinal order
    pub fn follower_delays(&self) -> Vec<Duration> {
        self.replication
            .followers
            .iter()
            .map(|f| Duration::from_millis(f.delay_ms))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[node]
id = "kv-1"
data_dir = "/tmp/wolfkv"

[wal]
fsync = false

[replication]
quorum_timeout_ms = 1500

[[replication.followers]]
name = "east"
delay_ms = 200

[[replication.followers]]
delay_ms = 500
"#;

        let config = WolfKvConfig::from_str(toml).unwrap();
        assert_eq!(config.node.id, "kv-1");
        assert_eq!(config.follower_count(), 2);
        assert_eq!(config.max_write_quorum(), 3);
        assert_eq!(config.wal_path(), PathBuf::from("/tmp/wolfkv/wolfkv.wal"));
        assert_eq!(config.quorum_timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.follower_delays(),
            vec![Duration::from_millis(200), Duration::from_millis(500)]
        );
        assert_eq!(config.replication.default_write_quorum, 1);
        assert!(config.api.enabled);
    }

    #[test]
    fn test_default_quorum_larger_than_replica_set() {
        let toml = r#"
[node]
id = "kv-1"

[replication]
default_write_quorum = 3

[[replication.followers]]
delay_ms = 10
"#;

        let err = WolfKvConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_empty_node_id_rejected() {
        let toml = r#"
[node]
id = ""
"#;
        assert!(WolfKvConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_bad_bind_address_rejected() {
        let toml = r#"
[node]
id = "kv-1"

[api]
bind_address = "not-an-address"
"#;
        assert!(WolfKvConfig::from_str(toml).is_err());
    }
}
