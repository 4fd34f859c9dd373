//! WolfKV - Replicated Key-Value Store
//!
//! A single-leader, multi-follower key-value store with tunable write
//! durability and read-repair.
//!
//! # Architecture
//!
//! Every write is appended to the leader's Write-Ahead Log (WAL) and
//! applied to the leader's in-memory store, then propagated to the
//! followers. Callers choose per write whether to return immediately
//! or wait for a quorum of replicas to acknowledge.
//!
//! # Features
//!
//! - Line-delimited JSON WAL, replayed on startup
//! - Fire-and-forget and quorum writes with a bounded wait
//! - Read-repair: reads reconcile all replicas to the newest value
//! - Pluggable replica transport (in-process simulation with link delays)
//! - HTTP API for reads and writes

pub mod config;
pub mod error;
pub mod store;
pub mod wal;
pub mod replication;
pub mod api;

pub use config::WolfKvConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfKvConfig;
    pub use crate::error::{Error, Result};
    pub use crate::store::{HybridClock, Record, RecordStore};
    pub use crate::wal::{WalEntry, WalReader, WalWriter};
    pub use crate::replication::{
        ReadRepairCoordinator, ReplicaId, ReplicaSet, ReplicationConfig, ReplicationCoordinator,
    };
}
