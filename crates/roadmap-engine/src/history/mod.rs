//! History Manager
//!
//! Full-snapshot undo/redo. Graphs stay in the tens to low hundreds of
//! nodes, so cloning the whole state per step is cheap enough.

use std::collections::VecDeque;

/// Bounded undo/redo stacks over snapshots of `S`
#[derive(Debug, Clone)]
pub struct History<S> {
    undo: VecDeque<S>,
    redo: Vec<S>,
    limit: usize,
}

impl<S> History<S> {
    /// Create with a maximum undo depth (at least 1)
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state from before a mutation
    ///
    /// Clears the redo stack; drops the oldest snapshot beyond the limit.
    pub fn push(&mut self, before: S) {
        self.redo.clear();
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Step back: returns the state to restore and keeps `current` for redo
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: returns the state to restore and keeps `current` for undo
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    /// Whether an undo is possible
    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo is possible
    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// `(undo, redo)` depths
    #[inline]
    #[must_use]
    pub fn depth(&self) -> (usize, usize) {
        (self.undo.len(), self.redo.len())
    }

    /// Drop both stacks
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::new(100)
    }
}
