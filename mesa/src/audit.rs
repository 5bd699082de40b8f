//! Append-only table state log.
//!
//! Every committed change to a table's status or fusion state produces one
//! [`TableStateLog`] entry, handed to an [`AuditSink`] after the transaction
//! commits. The core never reads the log back for its own decisions; reads
//! exist for reconstructing a table's history.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{ReservationId, TableId};
use crate::table::TableState;

/// One table state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStateLog {
    /// The table that changed.
    pub table_id: TableId,
    /// Its floor number at the time.
    pub table_number: u32,
    /// State after the change.
    pub new_state: TableState,
    /// Actor id that caused the change.
    pub changed_by: String,
    /// When the change was committed.
    pub timestamp: NaiveDateTime,
    /// Reservation that drove the change, if any.
    pub reservation: Option<ReservationId>,
}

/// Destination for table state log entries.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Appends entries in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be persisted.
    fn append(&self, entries: &[TableStateLog]) -> Result<()>;

    /// Returns every entry recorded for `table`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn history(&self, table: TableId) -> Result<Vec<TableStateLog>>;
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn append(&self, entries: &[TableStateLog]) -> Result<()> {
        (**self).append(entries)
    }

    fn history(&self, table: TableId) -> Result<Vec<TableStateLog>> {
        (**self).history(table)
    }
}

/// In-process sink; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<TableStateLog>>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<TableStateLog> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entries: &[TableStateLog]) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(entries);
        Ok(())
    }

    fn history(&self, table: TableId) -> Result<Vec<TableStateLog>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.table_id == table)
            .cloned()
            .collect())
    }
}

/// Sink writing one JSON object per line to a file.
///
/// The file is opened in append mode for every batch, so several processes
/// may share it.
#[derive(Debug, Clone)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
}

impl JsonLinesAuditSink {
    /// Creates a sink writing to `path`. The file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn append(&self, entries: &[TableStateLog]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for entry in entries {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn history(&self, table: TableId) -> Result<Vec<TableStateLog>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let mut history = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: TableStateLog = serde_json::from_str(&line)?;
            if entry.table_id == table {
                history.push(entry);
            }
        }
        Ok(history)
    }
}
