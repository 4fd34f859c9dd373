//! Hybrid Clock
//!
//! Wall-clock timestamps that never repeat and never run backwards
//! within a process.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Strictly increasing UTC timestamp source.
///
/// Every call to [`HybridClock::now`] returns a timestamp greater than
/// any previously returned or observed one. When the wall clock has not
/// moved (or moved backwards) the last timestamp is bumped by one
/// nanosecond.
#[derive(Debug)]
pub struct HybridClock {
    last: Mutex<DateTime<Utc>>,
}

impl HybridClock {
    /// Create a clock that has not issued any timestamp yet
    pub fn new() -> Self {
        Self {
            last: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Next timestamp
    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = if wall > *last {
            wall
        } else {
            *last + Duration::nanoseconds(1)
        };
        *last = next;
        next
    }

    /// Advance past a timestamp issued elsewhere (e.g. read back from the WAL)
    pub fn observe(&self, timestamp: DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if timestamp > *last {
            *last = timestamp;
        }
    }

    /// Latest timestamp issued or observed
    pub fn last(&self) -> DateTime<Utc> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}
