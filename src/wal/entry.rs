//! WAL Log Entry Types
//!
//! Defines the structure of entries written to the WAL, one JSON
//! object per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// A single accepted leader write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub key: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl WalEntry {
    /// Encode as a newline-terminated line
    pub fn to_line(&self) -> crate::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Decode one line (without its newline)
    pub fn from_line(line: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(line)?)
    }

    /// Convert into the record it describes
    pub fn into_record(self) -> Record {
        Record::new(self.key, self.value, self.timestamp)
    }
}

impl From<&Record> for WalEntry {
    fn from(record: &Record) -> Self {
        Self {
            key: record.key.clone(),
            value: record.value.clone(),
            timestamp: record.timestamp,
        }
    }
}
