//! WAL Writer
//!
//! Append-only writer for the Write-Ahead Log. Each append is a single
//! complete line; a failed append is cut back off the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::entry::WalEntry;
use crate::config::WalConfig;
use crate::error::{Error, Result};

const TAIL_SCAN_CHUNK: usize = 4096;

/// WAL writer owning the log file handle.
///
/// Not internally synchronized; the leader serializes appends by
/// holding the writer behind its write lock.
pub struct WalWriter {
    /// Log file path
    path: PathBuf,
    /// Open file handle (append mode)
    file: File,
    /// Length of the log up to the last complete entry
    committed_len: u64,
    /// Sync to disk after every append
    fsync: bool,
    /// Entries appended through this writer
    appended: u64,
    /// Set when a failed append could not be rolled back
    failed: bool,
    /// Next append writes only this many bytes, then errors
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl WalWriter {
    /// Open the log, creating it (and its directory) if absent.
    ///
    /// An incomplete trailing line left by a crash is truncated away so
    /// new entries never merge into it.
    pub fn open(path: impl AsRef<Path>, config: &WalConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        let committed_len = Self::last_complete_line_end(&mut file, len)?;
        if committed_len < len {
            tracing::warn!(
                "WAL {:?} ends with an incomplete entry; truncating {} trailing bytes",
                path,
                len - committed_len
            );
            file.set_len(committed_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            file,
            committed_len,
            fsync: config.fsync,
            appended: 0,
            failed: false,
            #[cfg(test)]
            fail_after: None,
        })
    }

    /// Find the offset just past the last newline
    fn last_complete_line_end(file: &mut File, len: u64) -> Result<u64> {
        let mut buf = [0u8; TAIL_SCAN_CHUNK];
        let mut end = len;

        while end > 0 {
            let start = end.saturating_sub(TAIL_SCAN_CHUNK as u64);
            let chunk = &mut buf[..(end - start) as usize];
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(chunk)?;

            if let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') {
                return Ok(start + pos as u64 + 1);
            }
            end = start;
        }

        Ok(0)
    }

    /// Append an entry durably.
    ///
    /// Returns only after the line has been written and flushed (and
    /// synced when `fsync` is enabled). On failure the log is truncated
    /// back to its last complete entry. If that truncation also fails the
    /// writer refuses every later append until the log is reopened.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.failed {
            return Err(Error::Wal(format!(
                "{:?} has an unrecovered partial entry; reopen the log",
                self.path
            )));
        }

        let line = entry.to_line()?;

        if let Err(e) = self.write_line(&line) {
            if let Err(truncate_err) = self.file.set_len(self.committed_len) {
                tracing::error!(
                    "Failed to roll back partial WAL append at offset {}: {}",
                    self.committed_len,
                    truncate_err
                );
                self.failed = true;
            }
            return Err(Error::Wal(format!("append to {:?} failed: {}", self.path, e)));
        }

        self.committed_len += line.len() as u64;
        self.appended += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        if let Some(result) = self.injected_failure(line) {
            return result;
        }
        self.file.write_all(line)?;
        self.file.flush()?;
        if self.fsync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn injected_failure(&mut self, line: &[u8]) -> Option<std::io::Result<()>> {
        let limit = self.fail_after.take()?;
        Some(
            self.file
                .write_all(&line[..limit.min(line.len())])
                .and_then(|_| Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "short write"))),
        )
    }

    #[cfg(not(test))]
    fn injected_failure(&mut self, _line: &[u8]) -> Option<std::io::Result<()>> {
        None
    }

    /// Make the next append stop after `bytes` bytes and fail
    #[cfg(test)]
    pub(crate) fn fail_next_append_after(&mut self, bytes: usize) {
        self.fail_after = Some(bytes);
    }

    /// Whether a failed rollback has disabled appends
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Force file contents to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of complete entries in the log
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    /// Entries appended since open
    pub fn appended(&self) -> u64 {
        self.appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn test_config() -> WalConfig {
        WalConfig {
            file_name: "test.wal".to_string(),
            fsync: false,
        }
    }

    fn entry(key: &str, value: &str) -> WalEntry {
        WalEntry {
            key: key.to_string(),
            value: value.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_writer_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("test.wal");

        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        writer.append(&entry("a", "1")).unwrap();
        writer.append(&entry("b", "2")).unwrap();

        assert_eq!(writer.appended(), 2);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));
        assert_eq!(writer.committed_len(), contents.len() as u64);
    }

    #[test]
    fn test_reopen_appends_after_existing_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut writer = WalWriter::open(&path, &test_config()).unwrap();
            writer.append(&entry("a", "1")).unwrap();
        }

        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        writer.append(&entry("b", "2")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_open_truncates_partial_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut writer = WalWriter::open(&path, &test_config()).unwrap();
            writer.append(&entry("a", "1")).unwrap();
        }
        let complete = std::fs::metadata(&path).unwrap().len();

        // Simulate a crash halfway through the next append
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"key":"b","val"#).unwrap();
        drop(file);

        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        assert_eq!(writer.committed_len(), complete);
        writer.append(&entry("c", "3")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"c\""));
    }

    #[test]
    fn test_open_truncates_file_without_any_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        std::fs::write(&path, b"garbage-without-newline").unwrap();

        let writer = WalWriter::open(&path, &test_config()).unwrap();
        assert_eq!(writer.committed_len(), 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_failed_append_leaves_no_partial_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        writer.append(&entry("a", "1")).unwrap();
        let committed = writer.committed_len();

        writer.fail_next_append_after(10);
        let err = writer.append(&entry("b", "2")).unwrap_err();
        assert!(matches!(err, Error::Wal(_)));
        assert_eq!(writer.committed_len(), committed);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), committed);
        assert!(!writer.is_failed());

        // The log stays usable and every line is complete
        writer.append(&entry("c", "3")).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"c\""));
        assert_eq!(writer.appended(), 2);
    }

    #[test]
    fn test_unrecoverable_append_disables_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        writer.append(&entry("a", "1")).unwrap();
        let committed = writer.committed_len();

        // A read-only handle fails both the write and the rollback
        writer.file = File::open(&path).unwrap();
        assert!(matches!(writer.append(&entry("b", "2")), Err(Error::Wal(_))));
        assert!(writer.is_failed());

        writer.file = OpenOptions::new().append(true).open(&path).unwrap();
        assert!(matches!(writer.append(&entry("c", "3")), Err(Error::Wal(_))));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), committed);

        // Reopening clears the condition
        let mut writer = WalWriter::open(&path, &test_config()).unwrap();
        writer.append(&entry("c", "3")).unwrap();
    }

    #[test]
    fn test_open_fails_when_directory_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let result = WalWriter::open(blocker.join("test.wal"), &test_config());
        assert!(result.is_err());
    }
}
