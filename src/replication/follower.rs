//! Follower Replica
//!
//! Receives replicated writes, repairs and fetches from the leader
//! side and applies them to its own store.

use std::sync::Arc;

use super::protocol::{ReplicaRequest, ReplicaResponse};
use crate::store::{HybridClock, RecordStore};

/// A follower replica with its own record store
#[derive(Debug)]
pub struct Follower {
    /// 1-based ordinal in the replica set
    ordinal: usize,
    /// Display name
    name: String,
    /// Local state
    store: RecordStore,
}

impl Follower {
    /// Create an empty follower
    pub fn new(ordinal: usize, name: impl Into<String>, clock: Arc<HybridClock>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            store: RecordStore::with_clock(clock),
        }
    }

    /// Serve one request from the leader side
    pub async fn handle(&self, request: ReplicaRequest) -> ReplicaResponse {
        match request {
            ReplicaRequest::Replicate { key, value } => {
                let record = self.store.set(key, value).await;
                tracing::debug!("Replicated key={} to follower {}", record.key, self.ordinal);
                ReplicaResponse::Applied(record)
            }
            ReplicaRequest::Repair { key, value } => {
                let record = self.store.set(key, value).await;
                tracing::debug!("Repaired follower {} with key={}", self.ordinal, record.key);
                ReplicaResponse::Applied(record)
            }
            ReplicaRequest::Fetch { key } => ReplicaResponse::Fetched(self.store.get(&key).await),
        }
    }

    /// Ordinal in the replica set
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follower_handles_requests() {
        let follower = Follower::new(1, "f1", Arc::new(HybridClock::new()));

        let fetched = follower
            .handle(ReplicaRequest::Fetch { key: "a".into() })
            .await;
        assert_eq!(fetched, ReplicaResponse::Fetched(None));

        let applied = follower
            .handle(ReplicaRequest::Replicate { key: "a".into(), value: "1".into() })
            .await
            .into_applied()
            .unwrap();
        assert_eq!(applied.value, "1");

        let repaired = follower
            .handle(ReplicaRequest::Repair { key: "a".into(), value: "2".into() })
            .await
            .into_applied()
            .unwrap();
        assert!(repaired.is_newer_than(&applied));
        assert_eq!(follower.store().get("a").await, Some(repaired));
    }
}
