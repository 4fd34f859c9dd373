//! Replication Module
//!
//! Leader/follower replication: fire-and-forget and quorum writes,
//! plus read-repair across every replica.

pub mod protocol;
mod leader;
mod follower;
mod transport;
mod replica_set;
mod coordinator;
mod read_repair;

pub use protocol::{ReplicaId, ReplicaRequest, ReplicaResponse};
pub use leader::Leader;
pub use follower::Follower;
pub use transport::{ReplicaTransport, SimulatedLink, SimulatedTransport};
pub use replica_set::ReplicaSet;
pub use coordinator::{QuorumAck, ReplicationCoordinator};
pub use read_repair::{select_latest, ReadRepairCoordinator, RepairReport};

use std::time::Duration;

use crate::config::ReplicationSettings;

/// Configuration for replication
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// How long a quorum write waits for acknowledgments
    pub quorum_timeout: Duration,
    /// Write quorum used when the caller does not name one
    pub default_write_quorum: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            quorum_timeout: Duration::from_secs(2),
            default_write_quorum: 1,
        }
    }
}

impl From<&ReplicationSettings> for ReplicationConfig {
    fn from(settings: &ReplicationSettings) -> Self {
        Self {
            quorum_timeout: Duration::from_millis(settings.quorum_timeout_ms),
            default_write_quorum: settings.default_write_quorum,
        }
    }
}

/// Reject keys the store cannot address
pub(crate) fn validate_key(key: &str) -> crate::Result<()> {
    if key.is_empty() {
        return Err(crate::Error::InvalidKey("key cannot be empty".into()));
    }
    Ok(())
}
