// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo history for the annotation store.
//!
//! Bounded stacks of immutable snapshots. A snapshot is captured before a
//! mutating gesture starts and committed on gesture end, but only if the
//! annotations actually changed; no-op gestures never enter the history.

use super::annotation::Annotation;
use super::store::AnnotationStore;

/// Immutable copy of everything undo has to restore.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub annotations: Vec<Annotation>,
    pub primary: Option<usize>,
    pub multi: Vec<usize>,
    pub active_class: u32,
}

impl Snapshot {
    /// Capture the current store state.
    pub fn of(store: &AnnotationStore) -> Self {
        Self {
            annotations: store.annotations.clone(),
            primary: store.primary(),
            multi: store.multi().to_vec(),
            active_class: store.active_class,
        }
    }

    /// Restore this snapshot into the store. Selection indices are pruned
    /// in case they no longer fit the restored annotation list.
    pub fn restore(&self, store: &mut AnnotationStore) {
        store.annotations = self.annotations.clone();
        store.active_class = self.active_class;
        store.select_set(self.multi.clone());
        store.prune_selection();
    }
}

/// History system for undo/redo functionality.
#[derive(Debug, Default)]
pub struct History {
    /// Undo stack (past states)
    undo_stack: Vec<Snapshot>,
    /// Redo stack (future states after undo)
    redo_stack: Vec<Snapshot>,
    /// Bumped on every commit, undo, and redo
    revision: u64,
}

/// Keep the last 50 states.
const MAX_HISTORY: usize = 50;

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit the pre-gesture snapshot, given the store as it looks now.
    ///
    /// Pushes only when the annotations differ structurally from the
    /// snapshot; any accepted commit clears the redo stack. Returns whether
    /// the commit was recorded.
    pub fn commit(&mut self, base: Snapshot, current: &AnnotationStore) -> bool {
        if base.annotations == current.annotations {
            return false;
        }
        self.undo_stack.push(base);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        self.revision += 1;
        true
    }

    /// Undo: restore previous state, banking the current one for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.revision += 1;
        Some(previous)
    }

    /// Redo: restore the state that was undone.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        self.revision += 1;
        Some(next)
    }

    /// Counter that advances on every commit, undo, and redo; lets callers
    /// notice edits without inspecting the stacks.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all history (image switch).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::Annotation;

    fn store_with(n: usize) -> AnnotationStore {
        AnnotationStore::from_annotations(
            (0..n)
                .map(|i| Annotation::BBox {
                    class: i as u32,
                    cx: 0.5,
                    cy: 0.5,
                    w: 0.1,
                    h: 0.1,
                })
                .collect(),
        )
    }

    #[test]
    fn test_noop_commit_rejected() {
        let mut history = History::new();
        let store = store_with(2);
        let base = Snapshot::of(&store);
        assert!(!history.commit(base, &store));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_restores_prior_state() {
        let mut history = History::new();
        let mut store = store_with(1);
        let base = Snapshot::of(&store);

        store.push_and_select(Annotation::BBox {
            class: 9,
            cx: 0.2,
            cy: 0.2,
            w: 0.1,
            h: 0.1,
        });
        assert!(history.commit(base, &store));

        let undone = history.undo(Snapshot::of(&store)).unwrap();
        undone.restore(&mut store);
        assert_eq!(store.annotations.len(), 1);

        let redone = history.redo(Snapshot::of(&store)).unwrap();
        redone.restore(&mut store);
        assert_eq!(store.annotations.len(), 2);
    }

    #[test]
    fn test_new_commit_clears_redo() {
        let mut history = History::new();
        let mut store = store_with(1);

        let base = Snapshot::of(&store);
        store.annotations.push(store.annotations[0].clone());
        history.commit(base, &store);

        let undone = history.undo(Snapshot::of(&store)).unwrap();
        undone.restore(&mut store);
        assert!(history.can_redo());

        let base = Snapshot::of(&store);
        store.annotations.clear();
        history.commit(base, &store);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_restore_prunes_stale_selection() {
        let mut store = store_with(3);
        store.select_set(vec![0, 2]);
        let snap = Snapshot {
            annotations: store.annotations[..1].to_vec(),
            primary: Some(2),
            multi: vec![0, 2],
            active_class: 0,
        };
        snap.restore(&mut store);
        assert_eq!(store.annotations.len(), 1);
        assert_eq!(store.multi(), &[0]);
        assert_eq!(store.primary(), Some(0));
    }
}
