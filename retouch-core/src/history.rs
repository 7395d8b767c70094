//! # Undo / Redo History
//!
//! Bounded linear history of edit states.
//!
//! ```text
//! snapshot(S)  : undo += S, redo cleared, oldest dropped past capacity
//! undo(cur)    : redo += cur, returns undo.pop()
//! redo(cur)    : undo += cur, returns redo.pop()
//! ```
//!
//! The manager never holds the current state; callers pass it in and get
//! the state to install back.

use std::collections::VecDeque;

use crate::error::{CoreError, CoreResult};
use crate::state::EditState;

/// Default number of retained undo snapshots.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Undo and redo stacks with a fixed undo capacity.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<EditState>,
    redo: Vec<EditState>,
    capacity: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    /// Create a history with [`DEFAULT_HISTORY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a history retaining at most `capacity` undo snapshots.
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Maximum number of undo snapshots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `current` before it is replaced. Invalidates redo.
    pub fn snapshot(&mut self, current: &EditState) {
        self.push_undo(current.clone());
        if !self.redo.is_empty() {
            tracing::trace!(discarded = self.redo.len(), "Redo stack invalidated");
            self.redo.clear();
        }
    }

    /// Step back. `current` moves onto the redo stack and the previous state
    /// is returned for installation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyHistory`] when there is nothing to undo; both
    /// stacks are left untouched.
    pub fn undo(&mut self, current: &EditState) -> CoreResult<EditState> {
        let previous = self.undo.pop_back().ok_or(CoreError::EmptyHistory)?;
        self.redo.push(current.clone());
        Ok(previous)
    }

    /// Step forward. `current` moves onto the undo stack and the next state
    /// is returned for installation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyRedo`] when there is nothing to redo; both
    /// stacks are left untouched.
    pub fn redo(&mut self, current: &EditState) -> CoreResult<EditState> {
        let next = self.redo.pop().ok_or(CoreError::EmptyRedo)?;
        self.push_undo(current.clone());
        Ok(next)
    }

    /// Drop every snapshot.
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Whether [`HistoryManager::undo`] would succeed.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether [`HistoryManager::redo`] would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo snapshots.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo snapshots.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo snapshots, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &EditState> {
        self.undo.iter()
    }

    fn push_undo(&mut self, state: EditState) {
        // Drop oldest if at capacity
        while self.undo.len() >= self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(state);
    }
}
