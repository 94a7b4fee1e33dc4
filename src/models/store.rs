// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation store: the ordered annotation list for the active image plus
//! selection state.
//!
//! Only the interaction state machine mutates this; the renderer and the
//! persistence adapter read it. Selection indices always refer to valid
//! positions in the annotation list; structural changes go through
//! `prune_selection` to drop anything stale.

use super::annotation::Annotation;

/// Annotations and selection for the currently loaded image.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    /// Ordered annotations; later entries draw on top
    pub annotations: Vec<Annotation>,
    /// Most-recently-touched member of `multi`, None when nothing selected
    primary: Option<usize>,
    /// Ordered multi-selection (insertion order)
    multi: Vec<usize>,
    /// Class assigned to newly created annotations
    pub active_class: u32,
    /// Unsaved changes since the last successful save
    dirty: bool,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations,
            ..Self::default()
        }
    }

    pub fn primary(&self) -> Option<usize> {
        self.primary
    }

    pub fn multi(&self) -> &[usize] {
        &self.multi
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.multi.contains(&index)
    }

    pub fn has_selection(&self) -> bool {
        !self.multi.is_empty()
    }

    /// Replace the selection with a single annotation.
    pub fn select_only(&mut self, index: usize) {
        if index < self.annotations.len() {
            self.multi = vec![index];
            self.primary = Some(index);
        }
    }

    /// Toggle multi-selection membership (Ctrl/Cmd+Click).
    pub fn toggle_selection(&mut self, index: usize) {
        if index >= self.annotations.len() {
            return;
        }
        if let Some(pos) = self.multi.iter().position(|&i| i == index) {
            self.multi.remove(pos);
            self.primary = self.multi.last().copied();
        } else {
            self.multi.push(index);
            self.primary = Some(index);
        }
    }

    /// Replace the selection with a set of indices (box select).
    pub fn select_set(&mut self, indices: Vec<usize>) {
        self.multi = indices
            .into_iter()
            .filter(|&i| i < self.annotations.len())
            .collect();
        self.primary = self.multi.last().copied();
    }

    /// Union a set of indices into the selection (Ctrl + box select).
    pub fn union_selection(&mut self, indices: Vec<usize>) {
        for i in indices {
            if i < self.annotations.len() && !self.multi.contains(&i) {
                self.multi.push(i);
            }
        }
        self.primary = self.multi.last().copied();
    }

    pub fn select_all(&mut self) {
        self.multi = (0..self.annotations.len()).collect();
        self.primary = self.multi.last().copied();
    }

    pub fn clear_selection(&mut self) {
        self.multi.clear();
        self.primary = None;
    }

    /// Drop selection indices that no longer reference an annotation.
    ///
    /// Called after undo/redo and any other structural change whose effect
    /// on indices is not tracked explicitly.
    pub fn prune_selection(&mut self) {
        let len = self.annotations.len();
        self.multi.retain(|&i| i < len);
        self.primary = match self.primary {
            Some(i) if i < len && self.multi.contains(&i) => Some(i),
            _ => self.multi.last().copied(),
        };
    }

    /// Append an annotation and select it.
    pub fn push_and_select(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
        self.select_only(self.annotations.len() - 1);
        self.dirty = true;
    }

    /// Append clones (paste) and select the inserted range.
    pub fn append_and_select(&mut self, annotations: Vec<Annotation>) {
        if annotations.is_empty() {
            return;
        }
        let start = self.annotations.len();
        self.annotations.extend(annotations);
        self.select_set((start..self.annotations.len()).collect());
        self.dirty = true;
    }

    /// Remove every selected annotation. Indices are removed in descending
    /// order so earlier removals don't shift later ones.
    pub fn delete_selected(&mut self) -> usize {
        let mut indices = self.multi.clone();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        let removed = indices.len();
        for i in indices {
            if i < self.annotations.len() {
                self.annotations.remove(i);
            }
        }
        self.clear_selection();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::Annotation;

    fn boxes(n: usize) -> Vec<Annotation> {
        (0..n)
            .map(|i| Annotation::BBox {
                class: i as u32,
                cx: 0.1 * (i + 1) as f64,
                cy: 0.5,
                w: 0.05,
                h: 0.05,
            })
            .collect()
    }

    #[test]
    fn test_toggle_selection_tracks_primary() {
        let mut store = AnnotationStore::from_annotations(boxes(3));
        store.toggle_selection(0);
        store.toggle_selection(2);
        assert_eq!(store.primary(), Some(2));
        assert_eq!(store.multi(), &[0, 2]);

        store.toggle_selection(2);
        assert_eq!(store.primary(), Some(0));
        store.toggle_selection(0);
        assert_eq!(store.primary(), None);
        assert!(!store.has_selection());
    }

    #[test]
    fn test_delete_selected_descending() {
        let mut store = AnnotationStore::from_annotations(boxes(4));
        store.select_set(vec![1, 3]);
        let removed = store.delete_selected();
        assert_eq!(removed, 2);
        assert_eq!(store.annotations.len(), 2);
        // Remaining boxes are the original 0 and 2
        assert_eq!(store.annotations[0].class(), 0);
        assert_eq!(store.annotations[1].class(), 2);
        assert!(!store.has_selection());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_prune_drops_stale_indices() {
        let mut store = AnnotationStore::from_annotations(boxes(4));
        store.select_set(vec![1, 3]);
        store.annotations.truncate(2);
        store.prune_selection();
        assert_eq!(store.multi(), &[1]);
        assert_eq!(store.primary(), Some(1));
    }

    #[test]
    fn test_paste_selects_inserted_range() {
        let mut store = AnnotationStore::from_annotations(boxes(2));
        store.append_and_select(boxes(2));
        assert_eq!(store.annotations.len(), 4);
        assert_eq!(store.multi(), &[2, 3]);
        assert_eq!(store.primary(), Some(3));
    }

    #[test]
    fn test_select_all() {
        let mut store = AnnotationStore::from_annotations(boxes(3));
        store.select_all();
        assert_eq!(store.multi(), &[0, 1, 2]);
    }
}
