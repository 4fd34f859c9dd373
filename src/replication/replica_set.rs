//! Replica Set
//!
//! The leader plus a fixed, ordered list of followers reached through
//! a [`ReplicaTransport`]. Built once at startup and shared by `Arc`.

use std::sync::Arc;

use super::leader::Leader;
use super::protocol::{ReplicaId, ReplicaRequest};
use super::transport::{ReplicaTransport, SimulatedTransport};
use crate::config::WolfKvConfig;
use crate::error::{Error, Result};
use crate::store::{HybridClock, Record};
use crate::wal::RecoveryReport;

/// Leader and followers of one key/value store
pub struct ReplicaSet {
    leader: Leader,
    transport: Arc<dyn ReplicaTransport>,
}

impl ReplicaSet {
    /// Assemble a replica set
    pub fn new(leader: Leader, transport: Arc<dyn ReplicaTransport>) -> Self {
        Self { leader, transport }
    }

    /// Recover the leader from its WAL and create in-process followers
    /// as described by `config`
    pub async fn open(config: &WolfKvConfig) -> Result<(Self, RecoveryReport)> {
        let clock = Arc::new(HybridClock::new());
        let (leader, report) =
            Leader::open(config.wal_path(), &config.wal, Arc::clone(&clock)).await?;
        let transport = SimulatedTransport::from_config(&config.replication.followers, clock);

        Ok((Self::new(leader, Arc::new(transport)), report))
    }

    /// The leader replica
    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    /// Transport to the followers
    pub fn transport(&self) -> &Arc<dyn ReplicaTransport> {
        &self.transport
    }

    /// Number of followers
    pub fn follower_count(&self) -> usize {
        self.transport.follower_count()
    }

    /// Leader plus followers
    pub fn replica_count(&self) -> usize {
        1 + self.follower_count()
    }

    /// Every replica, leader first then followers in ordinal order
    pub fn replica_ids(&self) -> Vec<ReplicaId> {
        std::iter::once(ReplicaId::Leader)
            .chain((1..=self.follower_count()).map(ReplicaId::Follower))
            .collect()
    }

    /// Reject selectors that name no replica of this set
    pub fn validate(&self, replica: ReplicaId) -> Result<()> {
        match replica {
            ReplicaId::Leader => Ok(()),
            ReplicaId::Follower(n) if n >= 1 && n <= self.follower_count() => Ok(()),
            ReplicaId::Follower(n) => Err(Error::InvalidReplica(format!(
                "follower {} does not exist (have {})",
                n,
                self.follower_count()
            ))),
        }
    }

    /// Read one replica's record for `key`
    pub async fn read(&self, key: &str, replica: ReplicaId) -> Result<Record> {
        self.fetch(key, replica)
            .await?
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// Read one replica's record for `key`, if any
    pub async fn fetch(&self, key: &str, replica: ReplicaId) -> Result<Option<Record>> {
        self.validate(replica)?;
        match replica {
            ReplicaId::Leader => Ok(self.leader.store().get(key).await),
            ReplicaId::Follower(n) => self
                .transport
                .send(n, ReplicaRequest::Fetch { key: key.to_string() })
                .await?
                .into_fetched(),
        }
    }

    /// Send a propagated write to a follower
    pub async fn replicate(&self, ordinal: usize, key: &str, value: &str) -> Result<Record> {
        self.transport
            .send(
                ordinal,
                ReplicaRequest::Replicate {
                    key: key.to_string(),
                    value: value.to_string(),
                },
            )
            .await?
            .into_applied()
    }

    /// Overwrite one replica's value as a fresh write.
    ///
    /// Leader repairs go through the WAL like any other leader write.
    pub async fn repair(&self, replica: ReplicaId, key: &str, value: &str) -> Result<Record> {
        self.validate(replica)?;
        match replica {
            ReplicaId::Leader => self.leader.apply(key, value).await,
            ReplicaId::Follower(n) => self
                .transport
                .send(
                    n,
                    ReplicaRequest::Repair {
                        key: key.to_string(),
                        value: value.to_string(),
                    },
                )
                .await?
                .into_applied(),
        }
    }
}
