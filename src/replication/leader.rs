//! Leader Replica
//!
//! The leader's store together with its WAL. Every leader write is
//! appended to the log before it becomes visible in the store.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::WalConfig;
use crate::error::Result;
use crate::store::{HybridClock, Record, RecordStore};
use crate::wal::{RecoveryReport, WalEntry, WalReader, WalWriter};

/// Leader replica state
pub struct Leader {
    /// In-memory state
    store: RecordStore,
    /// WAL writer; its lock serializes the whole leader write path
    wal: Mutex<WalWriter>,
}

impl Leader {
    /// Open the WAL at `wal_path` and rebuild the store from it
    pub async fn open(
        wal_path: impl AsRef<Path>,
        config: &WalConfig,
        clock: Arc<HybridClock>,
    ) -> Result<(Self, RecoveryReport)> {
        let wal_path = wal_path.as_ref();

        // Opening first cuts away any torn tail left by a crash
        let writer = WalWriter::open(wal_path, config)?;

        let store = RecordStore::with_clock(clock);
        let report = WalReader::new(wal_path).replay_into(&store).await?;

        tracing::info!(
            "Recovered {} entries ({} skipped) from WAL {:?}; {} keys",
            report.entries_read,
            report.lines_skipped,
            wal_path,
            store.len().await
        );

        Ok((
            Self {
                store,
                wal: Mutex::new(writer),
            },
            report,
        ))
    }

    /// Accept a write: stamp it, log it, then apply it.
    ///
    /// If the WAL append fails the store is left untouched and the
    /// error is returned.
    pub async fn apply(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Record> {
        let mut wal = self.wal.lock().await;

        let record = Record::new(key, value, self.store.clock().now());
        wal.append(&WalEntry::from(&record))?;
        self.store.apply(record.clone()).await;

        Ok(record)
    }

    /// Leader store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Flush and sync the WAL
    pub async fn sync(&self) -> Result<()> {
        self.wal.lock().await.sync()
    }

    /// WAL file path
    pub async fn wal_path(&self) -> std::path::PathBuf {
        self.wal.lock().await.path().to_path_buf()
    }
}
