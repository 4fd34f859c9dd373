//! Versioned Records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single versioned value held by a replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the given timestamp
    pub fn new(key: impl Into<String>, value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp,
        }
    }

    /// Last-write-wins comparison; equal timestamps are not newer
    pub fn is_newer_than(&self, other: &Record) -> bool {
        self.timestamp > other.timestamp
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}={} @ {}",
            self.key,
            self.value,
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
        )
    }
}
