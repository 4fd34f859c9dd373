//! Replication Protocol
//!
//! Messages exchanged between the leader and its followers, and the
//! addressing scheme for replicas.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::store::Record;

/// Identifies one replica of the set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaId {
    /// The single leader
    Leader,
    /// A follower by 1-based ordinal
    Follower(usize),
}

impl ReplicaId {
    /// Follower ordinal, if this is a follower
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            ReplicaId::Leader => None,
            ReplicaId::Follower(n) => Some(*n),
        }
    }
}

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplicaId::Leader => write!(f, "leader"),
            ReplicaId::Follower(n) => write!(f, "follower-{}", n),
        }
    }
}

impl FromStr for ReplicaId {
    type Err = Error;

    /// Accepts `leader`, `0` (the leader), a follower ordinal, or `follower-N`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("leader") {
            return Ok(ReplicaId::Leader);
        }

        let digits = s
            .strip_prefix("follower-")
            .or_else(|| s.strip_prefix("follower"))
            .unwrap_or(s);
        match digits.parse::<usize>() {
            Ok(0) if digits.len() == s.len() => Ok(ReplicaId::Leader),
            Ok(0) => Err(Error::InvalidReplica(s.to_string())),
            Ok(n) => Ok(ReplicaId::Follower(n)),
            Err(_) => Err(Error::InvalidReplica(s.to_string())),
        }
    }
}

/// Request sent to a follower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaRequest {
    /// Propagate a leader write
    Replicate { key: String, value: String },

    /// Overwrite a stale or missing value found by read-repair
    Repair { key: String, value: String },

    /// Read the follower's current record
    Fetch { key: String },
}

impl ReplicaRequest {
    /// Key the request refers to
    pub fn key(&self) -> &str {
        match self {
            ReplicaRequest::Replicate { key, .. }
            | ReplicaRequest::Repair { key, .. }
            | ReplicaRequest::Fetch { key } => key,
        }
    }
}

/// Follower reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaResponse {
    /// A write was applied; carries the stored record
    Applied(Record),

    /// Result of a fetch
    Fetched(Option<Record>),
}

impl ReplicaResponse {
    /// Expect an `Applied` reply
    pub fn into_applied(self) -> Result<Record> {
        match self {
            ReplicaResponse::Applied(record) => Ok(record),
            other => Err(Error::Replication(format!("expected Applied, got {:?}", other))),
        }
    }

    /// Expect a `Fetched` reply
    pub fn into_fetched(self) -> Result<Option<Record>> {
        match self {
            ReplicaResponse::Fetched(record) => Ok(record),
            other => Err(Error::Replication(format!("expected Fetched, got {:?}", other))),
        }
    }
}
