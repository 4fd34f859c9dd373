//! Read-Repair Coordinator
//!
//! Reads a key from every replica, returns the freshest record and
//! rewrites it onto replicas that are missing it or hold an older one.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use super::protocol::ReplicaId;
use super::replica_set::ReplicaSet;
use super::validate_key;
use crate::error::{Error, Result};
use crate::store::Record;

/// What a repairing read found and fixed
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    /// Authoritative record returned to the caller
    pub record: Record,
    /// Replicas that were rewritten
    pub repaired: Vec<ReplicaId>,
    /// Replicas whose repair failed
    pub failed: Vec<ReplicaId>,
    /// Replicas that could not be read at all
    pub unreachable: Vec<ReplicaId>,
}

/// Serves reads that reconcile every replica
#[derive(Clone)]
pub struct ReadRepairCoordinator {
    replicas: Arc<ReplicaSet>,
}

impl ReadRepairCoordinator {
    /// Create a coordinator for `replicas`
    pub fn new(replicas: Arc<ReplicaSet>) -> Self {
        Self { replicas }
    }

    /// Read `key` from all replicas, repair stale ones, return the freshest record
    pub async fn read_with_repair(&self, key: &str) -> Result<Record> {
        Ok(self.read_with_repair_report(key).await?.record)
    }

    /// Like [`read_with_repair`](Self::read_with_repair), also reporting
    /// which replicas were repaired.
    ///
    /// All replicas are queried before a winner is chosen, and every repair
    /// is attempted before returning. A failed repair is logged and listed
    /// in the report but never fails the read.
    pub async fn read_with_repair_report(&self, key: &str) -> Result<RepairReport> {
        validate_key(key)?;

        let ids = self.replicas.replica_ids();
        let responses = join_all(ids.into_iter().map(|id| async move {
            (id, self.replicas.fetch(key, id).await)
        }))
        .await;

        let mut observed: Vec<(ReplicaId, Option<Record>)> = Vec::with_capacity(responses.len());
        let mut unreachable = Vec::new();
        for (id, result) in responses {
            match result {
                Ok(record) => observed.push((id, record)),
                Err(e) => {
                    tracing::warn!("Read of key={} from {} failed: {}", key, id, e);
                    unreachable.push(id);
                }
            }
        }

        let latest = select_latest(observed.iter().filter_map(|(_, r)| r.as_ref()))
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let stale: Vec<ReplicaId> = observed
            .iter()
            .filter(|(_, record)| match record {
                None => true,
                Some(record) => latest.is_newer_than(record),
            })
            .map(|(id, _)| *id)
            .collect();

        let outcomes = join_all(stale.into_iter().map(|id| {
            let latest = &latest;
            async move {
                (id, self.replicas.repair(id, &latest.key, &latest.value).await)
            }
        }))
        .await;

        let mut repaired = Vec::new();
        let mut failed = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(_) => {
                    tracing::info!("[REPAIR] Repaired {} with key={}", id, latest.key);
                    repaired.push(id);
                }
                Err(e) => {
                    tracing::warn!("[REPAIR] Repair of {} with key={} failed: {}", id, latest.key, e);
                    failed.push(id);
                }
            }
        }

        Ok(RepairReport {
            record: latest,
            repaired,
            failed,
            unreachable,
        })
    }
}

/// Pick the record with the latest timestamp.
///
/// On equal timestamps the first record seen is kept.
pub fn select_latest<'a, I>(records: I) -> Option<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().fold(None, |best, candidate| match best {
        Some(best) if !candidate.is_newer_than(best) => Some(best),
        _ => Some(candidate),
    })
}
