//! Record Store Module
//!
//! In-memory key/value state held by every replica. Persistence is
//! handled by the WAL, not by the store itself.

pub mod clock;
mod record;

pub use clock::HybridClock;
pub use record::Record;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe map of key to latest [`Record`].
///
/// Writers take the lock exclusively; readers share it.
#[derive(Debug)]
pub struct RecordStore {
    /// Current record per key
    records: RwLock<HashMap<String, Record>>,
    /// Timestamp source, shared with the other replicas of a set
    clock: Arc<HybridClock>,
}

impl RecordStore {
    /// Create an empty store with its own clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(HybridClock::new()))
    }

    /// Create an empty store stamping records from `clock`
    pub fn with_clock(clock: Arc<HybridClock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Stamp a new record with the current time and store it,
    /// replacing any previous record for the key
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Record {
        let mut records = self.records.write().await;
        let record = Record::new(key, value, self.clock.now());
        records.insert(record.key.clone(), record.clone());
        record
    }

    /// Get the current record for a key
    pub async fn get(&self, key: &str) -> Option<Record> {
        self.records.read().await.get(key).cloned()
    }

    /// Install an already-stamped record unless the stored one is strictly newer.
    ///
    /// Returns whether the record was installed.
    pub async fn apply(&self, record: Record) -> bool {
        self.clock.observe(record.timestamp);

        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.key) {
            if existing.is_newer_than(&record) {
                return false;
            }
        }
        records.insert(record.key.clone(), record);
        true
    }

    /// Number of keys held
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of every record, sorted by key
    pub async fn snapshot(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// The clock this store stamps records with
    pub fn clock(&self) -> &Arc<HybridClock> {
        &self.clock
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = RecordStore::new();
        assert!(store.get("a").await.is_none());

        let stored = store.set("a", "1").await;
        assert_eq!(stored.value, "1");
        assert_eq!(store.get("a").await, Some(stored));
    }

    #[tokio::test]
    async fn test_set_replaces_previous_record() {
        let store = RecordStore::new();
        let first = store.set("a", "1").await;
        let second = store.set("a", "2").await;

        assert!(second.is_newer_than(&first));
        assert_eq!(store.get("a").await.unwrap().value, "2");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_apply_keeps_newer_record() {
        let store = RecordStore::new();
        let current = store.set("a", "new").await;
        let stale = Record::new("a", "old", current.timestamp - Duration::seconds(1));

        assert!(!store.apply(stale).await);
        assert_eq!(store.get("a").await.unwrap().value, "new");
    }

    #[tokio::test]
    async fn test_apply_advances_clock() {
        let store = RecordStore::new();
        let future = chrono::Utc::now() + Duration::minutes(10);
        assert!(store.apply(Record::new("a", "1", future)).await);

        let next = store.set("b", "2").await;
        assert!(next.timestamp > future);
    }

    #[tokio::test]
    async fn test_shared_clock_orders_across_stores() {
        let clock = Arc::new(HybridClock::new());
        let left = RecordStore::with_clock(Arc::clone(&clock));
        let right = RecordStore::with_clock(clock);

        let first = left.set("k", "x").await;
        let second = right.set("k", "y").await;
        assert!(second.is_newer_than(&first));
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = Arc::new(RecordStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(format!("key-{}", i % 8), i.to_string()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 8);
        assert_eq!(store.keys().await.first().map(String::as_str), Some("key-0"));
    }
}
