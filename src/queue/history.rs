use std::collections::VecDeque;

use super::entry::QueueEntry;

/// Maximum number of snapshots kept on each stack.
pub const HISTORY_DEPTH: usize = 10;

/// A copy of the queue taken before a mutation.
#[derive(Debug, Clone)]
pub struct Backup {
    pub entries: Vec<QueueEntry>,
    /// `Some(position)` when restoring should also move the flat position;
    /// the inner value is the saved position itself (which may be unset).
    pub saved_index: Option<Option<usize>>,
}

/// Bounded undo/redo stacks.
#[derive(Debug, Default)]
pub struct History {
    undo: VecDeque<Backup>,
    redo: VecDeque<Backup>,
}

impl History {
    fn push_bounded(stack: &mut VecDeque<Backup>, backup: Backup) {
        stack.push_back(backup);
        while stack.len() > HISTORY_DEPTH {
            stack.pop_front();
        }
    }

    /// Record the state before a regular mutation. Invalidates redo.
    pub fn record(&mut self, backup: Backup) {
        Self::push_bounded(&mut self.undo, backup);
        self.redo.clear();
    }

    /// Pop the latest undo snapshot, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Backup) -> Option<Backup> {
        let backup = self.undo.pop_back()?;
        Self::push_bounded(&mut self.redo, current);
        Some(backup)
    }

    /// Pop the latest redo snapshot, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Backup) -> Option<Backup> {
        let backup = self.redo.pop_back()?;
        Self::push_bounded(&mut self.undo, current);
        Some(backup)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
