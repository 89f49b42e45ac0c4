//! Calculation history
//!
//! [`HistoryLog`] is the ordered, append-only record of successful
//! calculations. It owns the path of its backing file; [`storage`] holds the
//! on-disk format used by [`HistoryLog::save`] and [`HistoryLog::load`].

pub mod storage;

use crate::evaluator::format_number;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

pub use storage::HistoryError;

/// One recorded calculation
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub expression: String,
    pub result: f64,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn new(expression: impl Into<String>, result: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            expression: expression.into(),
            result,
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.expression, format_number(self.result))
    }
}

/// Ordered history with optional size cap and a backing file
#[derive(Debug)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    max_entries: Option<usize>,
    path: PathBuf,
}

impl HistoryLog {
    /// `max_entries = None` keeps every entry.
    pub fn new(path: impl Into<PathBuf>, max_entries: Option<usize>) -> Self {
        HistoryLog {
            entries: Vec::new(),
            max_entries,
            path: path.into(),
        }
    }

    /// Record a calculation; drops the oldest entry when the cap is reached
    pub fn append(&mut self, expression: impl Into<String>, result: f64) {
        self.push(HistoryEntry::new(expression, result));
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if let Some(max) = self.max_entries {
            if self.entries.len() > max {
                let excess = self.entries.len() - max;
                self.entries.drain(..excess);
            }
        }
    }

    /// All entries, oldest first
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The `limit` most recent entries, oldest first
    pub fn recent(&self, limit: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }

    /// Empty the log; returns how many entries were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole log to its backing file; returns entries written
    pub fn save(&self) -> Result<usize, HistoryError> {
        storage::write_entries(&self.path, &self.entries)?;
        tracing::debug!(path = %self.path.display(), count = self.entries.len(), "history saved");
        Ok(self.entries.len())
    }

    /// Replace the log with the backing file's contents; returns entries
    /// loaded.
    ///
    /// A missing file loads nothing and leaves the log as it is. A malformed
    /// file is rejected as a whole, also leaving the log untouched.
    pub fn load(&mut self) -> Result<usize, HistoryError> {
        let Some(entries) = storage::read_entries(&self.path)? else {
            tracing::debug!(path = %self.path.display(), "no history file to load");
            return Ok(0);
        };

        self.entries = entries;
        self.enforce_cap();
        tracing::debug!(path = %self.path.display(), count = self.entries.len(), "history loaded");
        Ok(self.entries.len())
    }
}
