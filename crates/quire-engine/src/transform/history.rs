use std::collections::VecDeque;
use std::sync::Arc;

use crate::model::Selection;
use crate::transform::Step;

/// The inverse of one committed transaction plus where the caret was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub steps: Vec<Step>,
    pub selection: Selection,
}

/// Bounded undo and redo stacks. Entries are shared, so cloning a history
/// along with each new editor state is cheap.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Arc<HistoryEntry>>,
    redo_stack: Vec<Arc<HistoryEntry>>,
    max_undo: usize,
}

impl History {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn next_undo(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back().map(Arc::as_ref)
    }

    pub fn next_redo(&self) -> Option<&HistoryEntry> {
        self.redo_stack.last().map(Arc::as_ref)
    }

    /// A new edit: push its inverse and forget everything redoable.
    pub(crate) fn record(&mut self, entry: HistoryEntry) {
        self.push_undo(entry);
        self.redo_stack.clear();
    }

    /// The top undo entry was applied; `reverse` redoes it.
    pub(crate) fn undone(&mut self, reverse: HistoryEntry) {
        self.undo_stack.pop_back();
        self.redo_stack.push(Arc::new(reverse));
    }

    /// The top redo entry was applied; `reverse` undoes it again.
    pub(crate) fn redone(&mut self, reverse: HistoryEntry) {
        self.redo_stack.pop();
        self.push_undo(reverse);
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        if self.max_undo == 0 {
            return;
        }
        self.undo_stack.push_back(Arc::new(entry));
        while self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
        }
    }
}
