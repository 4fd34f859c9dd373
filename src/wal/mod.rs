//! Write-Ahead Log Module
//!
//! Append-only, newline-delimited JSON log of every accepted leader
//! write, replayed at startup to rebuild the leader's store.

pub mod entry;
mod writer;
mod reader;

pub use entry::WalEntry;
pub use writer::WalWriter;
pub use reader::{RecoveryReport, WalReader, WalScan};
