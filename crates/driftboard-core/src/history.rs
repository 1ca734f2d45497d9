//! Local undo/redo history with gesture-scoped boundaries.
//!
//! Every undo step is a list of [`Change`]s made by this connection. Undoing
//! applies their inverses, so edits made by other connections are never
//! rolled back wholesale; only the fields this connection wrote are restored.

use crate::layers::{Layer, LayerId, LayerPatch};

/// One reversible local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A layer was inserted at `index` of the order.
    Insert { id: LayerId, layer: Layer, index: usize },
    /// A layer was removed from `index` of the order.
    Remove { id: LayerId, layer: Layer, index: usize },
    /// Some fields of a layer changed.
    Fields {
        id: LayerId,
        before: LayerPatch,
        after: LayerPatch,
    },
    /// A layer id moved within the order.
    Move { id: LayerId, from: usize, to: usize },
    /// The local selection was replaced.
    Selection {
        before: Vec<LayerId>,
        after: Vec<LayerId>,
    },
}

impl Change {
    /// The change that undoes this one.
    pub fn inverse(&self) -> Change {
        match self.clone() {
            Change::Insert { id, layer, index } => Change::Remove { id, layer, index },
            Change::Remove { id, layer, index } => Change::Insert { id, layer, index },
            Change::Fields { id, before, after } => Change::Fields {
                id,
                before: after,
                after: before,
            },
            Change::Move { id, from, to } => Change::Move { id, from: to, to: from },
            Change::Selection { before, after } => Change::Selection {
                before: after,
                after: before,
            },
        }
    }

    /// Fold `next` into `self` when both describe the same target.
    fn absorb(&mut self, next: &Change) -> bool {
        match (self, next) {
            (
                Change::Fields { id, before, after },
                Change::Fields {
                    id: next_id,
                    before: next_before,
                    after: next_after,
                },
            ) if id == next_id => {
                *before = std::mem::take(before).or(next_before.clone());
                *after = next_after.clone().or(std::mem::take(after));
                true
            }
            (Change::Selection { after, .. }, Change::Selection { after: next_after, .. }) => {
                *after = next_after.clone();
                true
            }
            _ => false,
        }
    }
}

/// Merge adjacent changes of the same target so that a dragged gesture
/// stores one before/after pair instead of one per frame.
fn coalesce(changes: Vec<Change>) -> Vec<Change> {
    let mut result: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes {
        if !result.last_mut().is_some_and(|last| last.absorb(&change)) {
            result.push(change);
        }
    }
    result
}

/// Linear undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Vec<Change>>,
    redo_stack: Vec<Vec<Change>>,
    /// Changes buffered while a gesture holds the history paused.
    paused: Option<Vec<Change>>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(crate::config::MAX_UNDO_HISTORY)
    }
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            paused: None,
            max_entries: max_entries.max(1),
        }
    }

    /// Record a completed action as one undo step, or add it to the
    /// current gesture when paused.
    pub fn record(&mut self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }
        match &mut self.paused {
            Some(buffer) => buffer.extend(changes),
            None => self.push_entry(changes),
        }
    }

    fn push_entry(&mut self, changes: Vec<Change>) {
        let changes = coalesce(changes);
        if changes.is_empty() {
            return;
        }
        self.undo_stack.push(changes);
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Start buffering changes for a continuous gesture. Nested calls keep
    /// the existing buffer.
    pub fn pause(&mut self) {
        if self.paused.is_none() {
            self.paused = Some(Vec::new());
        }
    }

    /// Fold everything buffered since [`Self::pause`] into one undo step.
    pub fn resume(&mut self) {
        if let Some(buffer) = self.paused.take() {
            self.push_entry(buffer);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.paused.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop the last step and return the changes that revert it, in the
    /// order they must be applied. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Vec<Change>> {
        self.resume();
        let Some(entry) = self.undo_stack.pop() else {
            log::debug!("Nothing to undo");
            return None;
        };
        let inverse = entry.iter().rev().map(Change::inverse).collect();
        self.redo_stack.push(entry);
        Some(inverse)
    }

    /// Pop the last undone step and return its changes to re-apply.
    pub fn redo(&mut self) -> Option<Vec<Change>> {
        self.resume();
        let Some(entry) = self.redo_stack.pop() else {
            log::debug!("Nothing to redo");
            return None;
        };
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.paused = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn moved(id: LayerId, from: f64, to: f64) -> Change {
        Change::Fields {
            id,
            before: LayerPatch::position(from, from),
            after: LayerPatch::position(to, to),
        }
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut history = History::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut history = History::default();
        let id = Uuid::new_v4();
        history.record(vec![moved(id, 0.0, 1.0)]);
        assert!(history.can_undo());

        let undo = history.undo().unwrap();
        assert_eq!(undo, vec![moved(id, 1.0, 0.0)]);
        assert!(history.can_redo());

        let redo = history.redo().unwrap();
        assert_eq!(redo, vec![moved(id, 0.0, 1.0)]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_paused_gesture_is_one_step() {
        let mut history = History::default();
        let id = Uuid::new_v4();

        history.pause();
        history.record(vec![moved(id, 0.0, 1.0)]);
        history.record(vec![moved(id, 1.0, 2.0)]);
        history.record(vec![moved(id, 2.0, 3.0)]);
        assert_eq!(history.undo_count(), 0);
        history.resume();

        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo().unwrap(), vec![moved(id, 3.0, 0.0)]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut history = History::default();
        let id = Uuid::new_v4();
        history.record(vec![moved(id, 0.0, 1.0)]);
        history.undo();
        assert!(history.can_redo());

        history.record(vec![moved(id, 0.0, 5.0)]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_while_paused_closes_gesture() {
        let mut history = History::default();
        let id = Uuid::new_v4();
        history.pause();
        history.record(vec![moved(id, 0.0, 1.0)]);
        assert!(history.can_undo());

        assert!(history.undo().is_some());
        assert!(!history.is_paused());
    }

    #[test]
    fn test_resume_without_pause_and_empty_gesture() {
        let mut history = History::default();
        history.resume();
        history.pause();
        history.resume();
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn test_undo_reverses_order() {
        let mut history = History::default();
        let id = Uuid::new_v4();
        let selection = Change::Selection {
            before: vec![],
            after: vec![id],
        };
        history.record(vec![moved(id, 0.0, 1.0), selection.clone()]);

        let undo = history.undo().unwrap();
        assert_eq!(undo[0], selection.inverse());
        assert_eq!(undo[1], moved(id, 1.0, 0.0));
    }

    #[test]
    fn test_history_capacity() {
        let mut history = History::new(2);
        let id = Uuid::new_v4();
        for i in 0..5 {
            history.record(vec![Change::Move { id, from: i, to: i + 1 }]);
        }
        assert_eq!(history.undo_count(), 2);
    }
}
