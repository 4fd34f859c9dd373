//! Replication Coordinator
//!
//! Applies writes to the leader and fans them out to followers, either
//! without waiting or until a write quorum acknowledges.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::replica_set::ReplicaSet;
use super::{validate_key, ReplicationConfig};
use crate::error::{Error, Result};
use crate::store::Record;

/// Outcome of a successful quorum write
#[derive(Debug, Clone, Serialize)]
pub struct QuorumAck {
    /// The record as written on the leader
    pub record: Record,
    /// Acknowledgments observed, leader included
    pub acks: usize,
    /// Acknowledgments that were required
    pub required: usize,
}

/// Accepts writes on behalf of the replica set
#[derive(Clone)]
pub struct ReplicationCoordinator {
    replicas: Arc<ReplicaSet>,
    config: ReplicationConfig,
}

impl ReplicationCoordinator {
    /// Create a coordinator for `replicas`
    pub fn new(replicas: Arc<ReplicaSet>, config: ReplicationConfig) -> Self {
        Self { replicas, config }
    }

    /// Fire-and-forget write.
    ///
    /// Returns once the leader has logged and applied the write; followers
    /// are updated in the background with no staleness bound.
    pub async fn write(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Record> {
        let key = key.into();
        validate_key(&key)?;

        let record = self.replicas.leader().apply(key, value).await?;
        tracing::debug!("Leader wrote key={} value={}", record.key, record.value);

        self.spawn_propagation(&record, None);
        Ok(record)
    }

    /// Write and wait until `w` replicas (leader included) acknowledge.
    ///
    /// `None` uses the configured default quorum. A quorum of zero or one
    /// larger than the replica set fails before anything is written. On
    /// timeout the write stays committed on the leader and propagation
    /// continues; only the acknowledgment is reported as failed.
    pub async fn write_with_quorum(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        w: Option<usize>,
    ) -> Result<QuorumAck> {
        let key = key.into();
        validate_key(&key)?;

        let required = w.unwrap_or(self.config.default_write_quorum);
        let max = self.replicas.replica_count();
        if required == 0 || required > max {
            return Err(Error::InvalidQuorum { requested: required, max });
        }

        let record = self.replicas.leader().apply(key, value).await?;
        tracing::debug!("Leader wrote key={} value={} (w={})", record.key, record.value, required);

        if required == 1 {
            self.spawn_propagation(&record, None);
            return Ok(QuorumAck { record, acks: 1, required });
        }

        let deadline = tokio::time::Instant::now() + self.config.quorum_timeout;
        let (ack_tx, mut ack_rx) = mpsc::channel(self.replicas.follower_count());
        self.spawn_propagation(&record, Some(ack_tx));

        let mut acks = 1;
        while acks < required {
            match tokio::time::timeout_at(deadline, ack_rx.recv()).await {
                Ok(Some(ordinal)) => {
                    acks += 1;
                    tracing::debug!(
                        "Quorum ack {}/{} for key={} from follower {}",
                        acks,
                        required,
                        record.key,
                        ordinal
                    );
                }
                Ok(None) => {
                    // Every propagation finished and too many failed
                    tracing::warn!(
                        "Quorum unreachable for key={}: {}/{} acknowledgments",
                        record.key,
                        acks,
                        required
                    );
                    return Err(Error::Replication(format!(
                        "quorum unreachable: {}/{} acknowledgments",
                        acks, required
                    )));
                }
                Err(_) => {
                    tracing::warn!(
                        "Quorum write timed out for key={}: {}/{} acknowledgments",
                        record.key,
                        acks,
                        required
                    );
                    return Err(Error::QuorumTimeout { acks, required });
                }
            }
        }

        Ok(QuorumAck { record, acks, required })
    }

    /// Spawn one propagation task per follower.
    ///
    /// Each successful follower sends its ordinal on `acks`. Tasks are
    /// never cancelled; they outlive the caller's wait.
    fn spawn_propagation(&self, record: &Record, acks: Option<mpsc::Sender<usize>>) {
        for ordinal in 1..=self.replicas.follower_count() {
            let replicas = Arc::clone(&self.replicas);
            let key = record.key.clone();
            let value = record.value.clone();
            let acks = acks.clone();

            tokio::spawn(async move {
                match replicas.replicate(ordinal, &key, &value).await {
                    Ok(_) => {
                        tracing::debug!("Replicated key={} to follower {}", key, ordinal);
                        if let Some(acks) = acks {
                            // The waiter may already have its quorum or have timed out
                            let _ = acks.send(ordinal).await;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "Replication of key={} to follower {} failed: {}",
                            key,
                            ordinal,
                            e
                        );
                    }
                }
            });
        }
    }

    /// The replica set this coordinator writes to
    pub fn replicas(&self) -> &Arc<ReplicaSet> {
        &self.replicas
    }

    /// Active configuration
    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }
}
