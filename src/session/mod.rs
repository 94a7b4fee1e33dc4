// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Dataset session: the ordered, filtered image list and the cursor into it.
//!
//! The session owns navigation, sorting, and the filter, and decides which
//! neighbors are worth decoding ahead of time. Saving is debounced so a burst
//! of edits writes once, and rapid next/next/next scrubbing defers full-size
//! decodes until the cursor settles.

use crate::io::storage::{DatasetSource, FilterCriteria, ImageEntry, KeyValueStore};
use anyhow::Result;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Edits sit this long before the label file is written.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(400);
/// Navigation quieter than this is considered settled.
pub const SCRUB_GUARD: Duration = Duration::from_millis(300);
/// Neighbors decoded ahead of the cursor, weighted toward the direction
/// the user is usually heading.
const PRELOAD_BEHIND: usize = 3;
const PRELOAD_AHEAD: usize = 7;

const LAST_VIEWED_KEY_PREFIX: &str = "last_viewed:";

/// Ordering of the visible image list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Natural name order: digit runs compare numerically
    Name,
    /// File creation time, name as tiebreaker
    CreatedAt,
}

/// An open dataset folder.
pub struct Session {
    pub root: PathBuf,
    pub criteria: FilterCriteria,
    pub sort: SortOrder,
    pub sort_descending: bool,
    pub class_names: Vec<String>,
    all_images: Vec<ImageEntry>,
    /// Indices into `all_images`, filtered and sorted
    visible: Vec<usize>,
    /// Cursor into `visible`
    current: Option<usize>,
}

impl Session {
    /// List the folder and build the initial (unfiltered) view.
    pub fn open(source: &dyn DatasetSource, root: PathBuf) -> Result<Self> {
        let all_images = source.list_images(&root)?;
        let class_names = source.class_names(&root)?;
        let mut session = Self {
            root,
            criteria: FilterCriteria::match_all(),
            sort: SortOrder::Name,
            sort_descending: false,
            class_names,
            all_images,
            visible: Vec::new(),
            current: None,
        };
        session.rebuild_view(source)?;
        if session.current.is_none() && !session.visible.is_empty() {
            session.current = Some(0);
        }
        log::info!(
            "Opened {} with {} images",
            session.root.display(),
            session.all_images.len()
        );
        Ok(session)
    }

    /// Re-derive the visible list from the filter and sort order, keeping
    /// the cursor on the same image when it survives the filter.
    pub fn rebuild_view(&mut self, source: &dyn DatasetSource) -> Result<()> {
        let keep = self.current_path().map(Path::to_path_buf);

        let paths: Vec<PathBuf> = self.all_images.iter().map(|e| e.path.clone()).collect();
        let matched = source.filter_images(&paths, &self.criteria)?;

        let mut visible: Vec<usize> = self
            .all_images
            .iter()
            .enumerate()
            .filter(|(_, e)| matched.contains(&e.path))
            .map(|(i, _)| i)
            .collect();

        let entries = &self.all_images;
        match self.sort {
            SortOrder::Name => {
                visible.sort_by(|&a, &b| natural_cmp(&entries[a].path, &entries[b].path));
            }
            SortOrder::CreatedAt => {
                visible.sort_by(|&a, &b| {
                    match (entries[a].created_at, entries[b].created_at) {
                        (Some(ta), Some(tb)) if ta != tb => ta.cmp(&tb),
                        _ => natural_cmp(&entries[a].path, &entries[b].path),
                    }
                });
            }
        }
        if self.sort_descending {
            visible.reverse();
        }

        self.visible = visible;
        self.current = keep
            .and_then(|p| self.position_of(&p))
            .or(if self.visible.is_empty() { None } else { Some(0) });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// One-based position for the status line.
    pub fn position(&self) -> Option<usize> {
        self.current.map(|c| c + 1)
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current
            .and_then(|c| self.visible.get(c))
            .map(|&i| self.all_images[i].path.as_path())
    }

    /// Visible paths in display order.
    pub fn visible_paths(&self) -> impl Iterator<Item = &Path> {
        self.visible
            .iter()
            .map(move |&i| self.all_images[i].path.as_path())
    }

    fn position_of(&self, path: &Path) -> Option<usize> {
        self.visible
            .iter()
            .position(|&i| self.all_images[i].path == path)
    }

    /// Move the cursor by `delta`, clamped to the list ends. Returns the new
    /// current path when the cursor actually moved.
    pub fn advance(&mut self, delta: isize) -> Option<&Path> {
        let current = self.current?;
        let last = self.visible.len().checked_sub(1)?;
        let target = current.saturating_add_signed(delta).min(last);
        if target == current {
            return None;
        }
        self.current = Some(target);
        self.current_path()
    }

    /// Jump straight to a path; true when it is in the visible list.
    pub fn select_path(&mut self, path: &Path) -> bool {
        match self.position_of(path) {
            Some(pos) => {
                self.current = Some(pos);
                true
            }
            None => false,
        }
    }

    /// Neighbor paths worth decoding ahead of time, nearest first, skewed
    /// toward the images ahead of the cursor.
    pub fn preload_paths(&self) -> Vec<PathBuf> {
        let Some(current) = self.current else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(PRELOAD_BEHIND + PRELOAD_AHEAD);
        for step in 1..=PRELOAD_AHEAD.max(PRELOAD_BEHIND) {
            if step <= PRELOAD_AHEAD {
                if let Some(&i) = self.visible.get(current + step) {
                    out.push(self.all_images[i].path.clone());
                }
            }
            if step <= PRELOAD_BEHIND {
                if let Some(&i) = current.checked_sub(step).and_then(|p| self.visible.get(p)) {
                    out.push(self.all_images[i].path.clone());
                }
            }
        }
        out
    }

    /// Names matching a preview query, case-insensitive, without touching
    /// the active filter.
    pub fn search(&self, query: &str) -> Vec<PathBuf> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.visible_paths()
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .map(Path::to_path_buf)
            .collect()
    }

    // -- resume cursor ------------------------------------------------------

    fn cursor_key(&self) -> String {
        format!("{}{}", LAST_VIEWED_KEY_PREFIX, self.root.display())
    }

    /// Persist the current image so reopening the folder resumes here.
    pub fn store_cursor(&self, kv: &mut dyn KeyValueStore) {
        if let Some(path) = self.current_path() {
            kv.set(&self.cursor_key(), &path.to_string_lossy());
        }
    }

    /// Restore a previously stored cursor; ignored if the image is gone or
    /// filtered out.
    pub fn restore_cursor(&mut self, kv: &dyn KeyValueStore) {
        if let Some(stored) = kv.get(&self.cursor_key()) {
            self.select_path(Path::new(&stored));
        }
    }
}

/// Natural filename ordering: digit runs compare as numbers, text runs
/// case-insensitively, so `img2` sorts before `img10`.
pub fn natural_cmp(a: &Path, b: &Path) -> Ordering {
    let a_name = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let b_name = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let mut a_chars = a_name.chars().peekable();
    let mut b_chars = b_name.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut a_chars);
                    let nb = take_number(&mut b_chars);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    a_chars.next();
                    b_chars.next();
                    match ca
                        .to_lowercase()
                        .cmp(cb.to_lowercase())
                    {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> u64 {
    let mut value: u64 = 0;
    while let Some(c) = chars.peek().copied() {
        if let Some(d) = c.to_digit(10) {
            value = value.saturating_mul(10).saturating_add(d as u64);
            chars.next();
        } else {
            break;
        }
    }
    value
}

/// Coalesces bursts of edits into one save.
#[derive(Debug, Default)]
pub struct SaveDebouncer {
    deadline: Option<Instant>,
}

impl SaveDebouncer {
    /// Called on every edit; pushes the deadline out.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + SAVE_DEBOUNCE);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the quiet period has elapsed; clears the deadline.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Explicit save or navigation bypasses the wait.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Tracks how recently the user navigated, so held-key scrubbing only
/// decodes the image the cursor finally lands on.
#[derive(Debug, Default)]
pub struct ScrubGuard {
    last_nav: Option<Instant>,
}

impl ScrubGuard {
    pub fn mark(&mut self, now: Instant) {
        self.last_nav = Some(now);
    }

    /// True when navigation has been quiet long enough to decode.
    pub fn settled(&self, now: Instant) -> bool {
        match self.last_nav {
            Some(last) => now.duration_since(last) >= SCRUB_GUARD,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::{ClassFilter, LabelMetadata};
    use anyhow::Result;
    use std::collections::HashMap;
    use std::time::SystemTime;

    struct FakeSource {
        entries: Vec<(PathBuf, LabelMetadata, Option<SystemTime>)>,
        classes: Vec<String>,
    }

    impl FakeSource {
        fn with_names(names: &[&str]) -> Self {
            Self {
                entries: names
                    .iter()
                    .map(|n| (PathBuf::from(n), LabelMetadata::default(), None))
                    .collect(),
                classes: Vec::new(),
            }
        }
    }

    impl DatasetSource for FakeSource {
        fn list_images(&self, _folder: &Path) -> Result<Vec<ImageEntry>> {
            Ok(self
                .entries
                .iter()
                .map(|(p, _, t)| ImageEntry {
                    path: p.clone(),
                    created_at: *t,
                })
                .collect())
        }

        fn image_metadata(&self, paths: &[PathBuf]) -> Result<HashMap<PathBuf, LabelMetadata>> {
            Ok(self
                .entries
                .iter()
                .filter(|(p, _, _)| paths.contains(p))
                .map(|(p, m, _)| (p.clone(), m.clone()))
                .collect())
        }

        fn filter_images(
            &self,
            paths: &[PathBuf],
            criteria: &FilterCriteria,
        ) -> Result<Vec<PathBuf>> {
            let meta = self.image_metadata(paths)?;
            Ok(paths
                .iter()
                .filter(|p| {
                    meta.get(*p)
                        .map(|m| criteria.matches(p, m))
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        }

        fn class_names(&self, _folder: &Path) -> Result<Vec<String>> {
            Ok(self.classes.clone())
        }
    }

    #[test]
    fn test_natural_sort_order() {
        let source = FakeSource::with_names(&["img10.png", "img2.png", "img1.png", "Img3.png"]);
        let session = Session::open(&source, PathBuf::from("/data")).unwrap();
        let names: Vec<_> = session
            .visible_paths()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["img1.png", "img2.png", "Img3.png", "img10.png"]);
    }

    #[test]
    fn test_descending_sort_reverses_list() {
        let source = FakeSource::with_names(&["img2.png", "img10.png", "img1.png"]);
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        session.sort_descending = true;
        session.rebuild_view(&source).unwrap();
        let names: Vec<_> = session
            .visible_paths()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["img10.png", "img2.png", "img1.png"]);
    }

    #[test]
    fn test_empty_folder_has_no_cursor() {
        let source = FakeSource::with_names(&[]);
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        assert!(session.is_empty());
        assert_eq!(session.position(), None);
        assert!(session.current_path().is_none());
        assert!(session.advance(1).is_none());
    }

    #[test]
    fn test_advance_clamps_at_ends() {
        let source = FakeSource::with_names(&["a.png", "b.png", "c.png"]);
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        assert_eq!(session.position(), Some(1));
        assert!(session.advance(-1).is_none());
        assert!(session.advance(1).is_some());
        assert!(session.advance(10).is_some()); // lands on the last image
        assert_eq!(session.position(), Some(3));
        assert!(session.advance(1).is_none());
    }

    #[test]
    fn test_filter_keeps_cursor_on_surviving_image() {
        let mut source = FakeSource::with_names(&["cat1.png", "dog1.png", "cat2.png"]);
        source.entries[1].1 = LabelMetadata {
            classes: vec![0],
            count: 1,
        };
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        session.select_path(Path::new("cat2.png"));

        session.criteria.name_query = "cat".to_string();
        session.rebuild_view(&source).unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(
            session.current_path(),
            Some(Path::new("cat2.png"))
        );
    }

    #[test]
    fn test_filter_resets_cursor_when_current_drops_out() {
        let source = FakeSource::with_names(&["cat1.png", "dog1.png"]);
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        session.select_path(Path::new("dog1.png"));

        session.criteria.name_query = "cat".to_string();
        session.rebuild_view(&source).unwrap();
        assert_eq!(session.current_path(), Some(Path::new("cat1.png")));
    }

    #[test]
    fn test_class_filter_composes_with_count() {
        let mut source = FakeSource::with_names(&["a.png", "b.png", "c.png"]);
        source.entries[0].1 = LabelMetadata {
            classes: vec![0, 1],
            count: 2,
        };
        source.entries[1].1 = LabelMetadata {
            classes: vec![0],
            count: 1,
        };
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();

        session.criteria.class_mode = ClassFilter::Only {
            classes: [0].into_iter().collect(),
            match_all: false,
        };
        session.rebuild_view(&source).unwrap();
        // Only b: a also carries class 1, c has no labels
        assert_eq!(session.len(), 1);
        assert_eq!(session.current_path(), Some(Path::new("b.png")));
    }

    #[test]
    fn test_preload_window_skews_ahead() {
        let names: Vec<String> = (0..30).map(|i| format!("img{:03}.png", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let source = FakeSource::with_names(&refs);
        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        session.select_path(Path::new("img010.png"));

        let preload = session.preload_paths();
        assert_eq!(preload.len(), 10);
        // Nearest neighbors come first
        assert_eq!(preload[0], Path::new("img011.png"));
        assert_eq!(preload[1], Path::new("img009.png"));
        let ahead = preload
            .iter()
            .filter(|p| p.to_string_lossy().as_ref() > "img010.png")
            .count();
        assert_eq!(ahead, 7);
    }

    #[test]
    fn test_preload_window_truncates_at_list_start() {
        let source = FakeSource::with_names(&["a.png", "b.png", "c.png"]);
        let session = Session::open(&source, PathBuf::from("/data")).unwrap();
        let preload = session.preload_paths();
        assert_eq!(preload, vec![PathBuf::from("b.png"), PathBuf::from("c.png")]);
    }

    #[test]
    fn test_search_is_preview_only() {
        let source = FakeSource::with_names(&["cat1.png", "dog1.png", "cat2.png"]);
        let session = Session::open(&source, PathBuf::from("/data")).unwrap();
        let hits = session.search("CAT");
        assert_eq!(hits.len(), 2);
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_cursor_roundtrip_through_kv() {
        use crate::io::storage::MemoryKeyValue;
        let source = FakeSource::with_names(&["a.png", "b.png", "c.png"]);
        let mut kv = MemoryKeyValue::default();

        let mut session = Session::open(&source, PathBuf::from("/data")).unwrap();
        session.select_path(Path::new("b.png"));
        session.store_cursor(&mut kv);

        let mut reopened = Session::open(&source, PathBuf::from("/data")).unwrap();
        reopened.restore_cursor(&kv);
        assert_eq!(reopened.current_path(), Some(Path::new("b.png")));
    }

    #[test]
    fn test_save_debouncer() {
        let mut debouncer = SaveDebouncer::default();
        let t0 = Instant::now();
        debouncer.touch(t0);
        assert!(!debouncer.take_due(t0 + Duration::from_millis(100)));
        // Another edit pushes the deadline out
        debouncer.touch(t0 + Duration::from_millis(300));
        assert!(!debouncer.take_due(t0 + Duration::from_millis(500)));
        assert!(debouncer.take_due(t0 + Duration::from_millis(700)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_scrub_guard_settles_after_quiet_period() {
        let mut guard = ScrubGuard::default();
        let t0 = Instant::now();
        assert!(guard.settled(t0));
        guard.mark(t0);
        assert!(!guard.settled(t0 + Duration::from_millis(100)));
        assert!(guard.settled(t0 + Duration::from_millis(300)));
    }
}
