//! WAL Reader
//!
//! Sequential replay of the whole log. Malformed lines are diagnosed
//! and skipped so a torn trailing entry never blocks recovery.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::entry::WalEntry;
use crate::error::Result;
use crate::store::RecordStore;

/// Result of scanning a log file
#[derive(Debug, Default)]
pub struct WalScan {
    /// Entries in append order
    pub entries: Vec<WalEntry>,
    /// Number of lines that could not be decoded
    pub skipped: usize,
}

/// Summary of rebuilding a store from the log
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Entries read from the log
    pub entries_read: usize,
    /// Entries that replaced store state
    pub entries_applied: usize,
    /// Malformed lines skipped
    pub lines_skipped: usize,
}

/// WAL reader for replaying log entries
pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    /// Create a reader for the log at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every decodable entry in append order
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        Ok(self.scan()?.entries)
    }

    /// Read the whole log, counting skipped lines
    pub fn scan(&self) -> Result<WalScan> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WalScan::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut scan = WalScan::default();
        let mut line = Vec::new();
        let mut line_no = 0usize;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_no += 1;

            let content = trim_line(&line);
            if content.is_empty() {
                continue;
            }

            match WalEntry::from_line(content) {
                Ok(entry) => scan.entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        "Skipping invalid WAL entry at {:?} line {}: {}",
                        self.path,
                        line_no,
                        e
                    );
                    scan.skipped += 1;
                }
            }
        }

        Ok(scan)
    }

    /// Rebuild `store` by replaying the log with last-write-wins
    pub async fn replay_into(&self, store: &RecordStore) -> Result<RecoveryReport> {
        let scan = self.scan()?;
        let mut report = RecoveryReport {
            entries_read: scan.entries.len(),
            lines_skipped: scan.skipped,
            ..Default::default()
        };

        for entry in scan.entries {
            if store.apply(entry.into_record()).await {
                report.entries_applied += 1;
            }
        }

        Ok(report)
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}
