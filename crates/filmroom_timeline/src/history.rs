// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of timeline snapshots.
//!
//! Each edit records the snapshot it replaced, serialized with bincode.
//! Undo swaps the current snapshot for the recorded one and keeps the
//! current one for redo.

use crate::timeline::GameTimeline;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Default maximum undo depth
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized timeline snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized timeline
    pub data: Vec<u8>,
    /// Timestamp when the snapshot was taken
    pub timestamp: u64,
}

impl StateSnapshot {
    /// Snapshot a timeline
    pub fn capture(timeline: &GameTimeline) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(timeline)?,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        })
    }

    /// Restore the timeline
    pub fn restore(&self) -> Result<GameTimeline> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    description: String,
    snapshot: StateSnapshot,
}

/// History statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Entries in the undo stack
    pub undo_count: usize,
    /// Entries in the redo stack
    pub redo_count: usize,
    /// Bytes held by both stacks
    pub memory_used: usize,
    /// Maximum undo depth
    pub max_depth: usize,
}

/// Undo/redo stack of timeline snapshots
#[derive(Debug, Clone)]
pub struct TimelineHistory {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_depth: usize,
}

impl TimelineHistory {
    /// Create with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// Create with a custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    /// Record the snapshot an edit is about to replace
    pub fn record(&mut self, before: &GameTimeline, description: impl Into<String>) -> Result<()> {
        let entry = HistoryEntry {
            description: description.into(),
            snapshot: StateSnapshot::capture(before)?,
        };

        self.redo_stack.clear();
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        Ok(())
    }

    /// Step back. Returns the snapshot to make current.
    pub fn undo(&mut self, current: &GameTimeline) -> Result<GameTimeline> {
        let entry = self.undo_stack.back().ok_or(HistoryError::NothingToUndo)?;
        let previous = entry.snapshot.restore()?;
        let redo = HistoryEntry {
            description: entry.description.clone(),
            snapshot: StateSnapshot::capture(current)?,
        };

        self.undo_stack.pop_back();
        self.redo_stack.push_back(redo);
        Ok(previous)
    }

    /// Step forward again. Returns the snapshot to make current.
    pub fn redo(&mut self, current: &GameTimeline) -> Result<GameTimeline> {
        let entry = self.redo_stack.back().ok_or(HistoryError::NothingToRedo)?;
        let next = entry.snapshot.restore()?;
        let undo = HistoryEntry {
            description: entry.description.clone(),
            snapshot: StateSnapshot::capture(current)?,
        };

        self.redo_stack.pop_back();
        self.undo_stack.push_back(undo);
        Ok(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the next undo
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Description of the next redo
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        let memory_used = self
            .undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|e| e.snapshot.size())
            .sum();
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used,
            max_depth: self.max_depth,
        }
    }
}

impl Default for TimelineHistory {
    fn default() -> Self {
        Self::new()
    }
}
