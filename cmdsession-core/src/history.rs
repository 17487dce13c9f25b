//! Command history for a session.
//!
//! `HistoryLog` is the in-memory log plus the browse cursor used for
//! Up/Down navigation. `HistoryFile` is an optional JSON store a front-end
//! can use to carry history across restarts; the session itself never
//! touches the disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SessionError};

/// Ordered log of submitted commands plus a browse cursor.
///
/// The cursor ranges over `0..=len`. `len` is the empty "new command" slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<String>,
    cursor: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from restored entries; the cursor starts at the tail.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let cursor = entries.len();
        Self { entries, cursor }
    }

    /// Append and stop browsing.
    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push(command.into());
        self.cursor = self.entries.len();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Step back one entry. `None` at the oldest entry or when empty.
    pub fn browse_previous(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward one entry. `None` at the newest entry or when empty.
    pub fn browse_next(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON array of commands on disk.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved entries. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| SessionError::ReadFile {
            path: self.path.clone(),
            source,
        })?;

        let entries: Vec<String> =
            serde_json::from_str(&content).map_err(|source| SessionError::ParseHistory {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = ?self.path, count = entries.len(), "history loaded");
        Ok(entries)
    }

    /// Overwrite the file with `entries`, creating parent directories.
    pub fn save(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SessionError::WriteFile {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(entries).map_err(SessionError::EncodeHistory)?;
        fs::write(&self.path, json).map_err(|source| SessionError::WriteFile {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = ?self.path, count = entries.len(), "history saved");
        Ok(())
    }
}
