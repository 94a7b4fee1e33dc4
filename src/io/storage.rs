// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Storage collaborators the editor depends on.
//!
//! The editor never touches the filesystem directly; it talks to these
//! ports so tests can swap in in-memory implementations. The filesystem
//! backends follow the usual dataset layout: images anywhere under the
//! folder, `<stem>.txt` label files beside them, and an optional
//! `classes.txt` with one class name per line.

use crate::io::label_format;
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Image file extensions recognized when listing a dataset folder.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// One image in the dataset listing.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub created_at: Option<SystemTime>,
}

/// Lightweight label facts used for filtering, fetched without parsing
/// full geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMetadata {
    pub classes: Vec<u32>,
    pub count: usize,
}

/// Class-membership mode of the filter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    /// No class constraint
    #[default]
    Any,
    /// Image must have zero annotations
    None,
    /// Every annotation's class must be in the selected set; with
    /// `match_all`, every selected class must also appear on the image.
    Only {
        classes: BTreeSet<u32>,
        match_all: bool,
    },
}

/// The filter predicate evaluated over image metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    /// Case-insensitive substring of the file name
    pub name_query: String,
    pub min_labels: usize,
    pub max_labels: usize,
    pub class_mode: ClassFilter,
}

impl FilterCriteria {
    /// A criteria that matches everything.
    pub fn match_all() -> Self {
        Self {
            name_query: String::new(),
            min_labels: 0,
            max_labels: usize::MAX,
            class_mode: ClassFilter::Any,
        }
    }

    /// Evaluate the predicate against one image's name and metadata.
    pub fn matches(&self, path: &Path, meta: &LabelMetadata) -> bool {
        if !self.name_query.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !name.contains(&self.name_query.to_lowercase()) {
                return false;
            }
        }
        if meta.count < self.min_labels || meta.count > self.max_labels {
            return false;
        }
        match &self.class_mode {
            ClassFilter::Any => true,
            ClassFilter::None => meta.count == 0,
            ClassFilter::Only { classes, match_all } => {
                if meta.count == 0 || classes.is_empty() {
                    return false;
                }
                let present: BTreeSet<u32> = meta.classes.iter().copied().collect();
                if !present.iter().all(|c| classes.contains(c)) {
                    return false;
                }
                if *match_all {
                    classes.iter().all(|c| present.contains(c))
                } else {
                    true
                }
            }
        }
    }
}

/// Loads and saves per-image label text. Absence of a label file is not an
/// error; it reads as the empty string.
pub trait LabelStore {
    fn load_label_text(&self, image: &Path) -> Result<String>;
    fn save_label_text(&self, image: &Path, text: &str) -> Result<()>;
}

/// Lists a dataset folder and answers metadata/filter queries over it.
pub trait DatasetSource {
    fn list_images(&self, folder: &Path) -> Result<Vec<ImageEntry>>;
    fn image_metadata(&self, paths: &[PathBuf]) -> Result<HashMap<PathBuf, LabelMetadata>>;
    fn filter_images(&self, paths: &[PathBuf], criteria: &FilterCriteria) -> Result<Vec<PathBuf>>;
    /// Class names from `classes.txt`, empty when absent.
    fn class_names(&self, folder: &Path) -> Result<Vec<String>>;
}

/// Small key-value slot for clipboard contents and UI preferences.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Label path for an image: same stem, `.txt` extension, same directory.
pub fn label_path_for(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

// ---------------------------------------------------------------------------
// Filesystem backends
// ---------------------------------------------------------------------------

/// Filesystem-backed dataset: labels live beside the images.
#[derive(Debug, Default)]
pub struct FsDataset;

impl LabelStore for FsDataset {
    fn load_label_text(&self, image: &Path) -> Result<String> {
        let path = label_path_for(image);
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read label file {}", path.display()))
    }

    fn save_label_text(&self, image: &Path, text: &str) -> Result<()> {
        let path = label_path_for(image);
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write label file {}", path.display()))
    }
}

impl DatasetSource for FsDataset {
    fn list_images(&self, folder: &Path) -> Result<Vec<ImageEntry>> {
        let mut entries = Vec::new();
        collect_images(folder, &mut entries)?;
        log::info!("Listed {} images under {}", entries.len(), folder.display());
        Ok(entries)
    }

    fn image_metadata(&self, paths: &[PathBuf]) -> Result<HashMap<PathBuf, LabelMetadata>> {
        let mut map = HashMap::new();
        for path in paths {
            let text = self.load_label_text(path)?;
            map.insert(path.clone(), metadata_from_text(&text));
        }
        Ok(map)
    }

    fn filter_images(&self, paths: &[PathBuf], criteria: &FilterCriteria) -> Result<Vec<PathBuf>> {
        let metadata = self.image_metadata(paths)?;
        Ok(paths
            .iter()
            .filter(|p| {
                let meta = metadata.get(*p).cloned().unwrap_or_default();
                criteria.matches(p, &meta)
            })
            .cloned()
            .collect())
    }

    fn class_names(&self, folder: &Path) -> Result<Vec<String>> {
        let path = folder.join("classes.txt");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(content
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

/// Compute filter metadata from raw label text.
///
/// Only token counts and the class token matter here, so a cheap pass over
/// the parsed annotations is fine.
pub fn metadata_from_text(text: &str) -> LabelMetadata {
    let (annotations, _) = label_format::parse_labels(text);
    LabelMetadata {
        classes: annotations.iter().map(|a| a.class()).collect(),
        count: annotations.len(),
    }
}

fn collect_images(dir: &Path, out: &mut Vec<ImageEntry>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if is_image(&path) {
            let created_at = entry.metadata().ok().and_then(|m| m.created().ok());
            out.push(ImageEntry { path, created_at });
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// JSON-file key-value store under the user's config directory.
#[derive(Debug)]
pub struct FsKeyValue {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FsKeyValue {
    /// Open (or create) the preference file for this application.
    pub fn open_default() -> Self {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("boxlab");
        Self::open(dir.join("preferences.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, values }
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.values) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.path, text) {
                    log::warn!("Failed to persist preferences: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to encode preferences: {}", e),
        }
    }
}

impl KeyValueStore for FsKeyValue {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.flush();
    }
}

/// In-memory key-value store for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryKeyValue {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(count: usize, classes: &[u32]) -> LabelMetadata {
        LabelMetadata {
            classes: classes.to_vec(),
            count,
        }
    }

    #[test]
    fn test_filter_count_range() {
        let criteria = FilterCriteria {
            min_labels: 1,
            max_labels: 4,
            ..FilterCriteria::match_all()
        };
        let path = Path::new("img.png");
        assert!(!criteria.matches(path, &meta(0, &[])));
        assert!(criteria.matches(path, &meta(1, &[0])));
        assert!(criteria.matches(path, &meta(3, &[0, 1, 0])));
        assert!(!criteria.matches(path, &meta(5, &[0; 5])));
    }

    #[test]
    fn test_filter_name_substring_case_insensitive() {
        let criteria = FilterCriteria {
            name_query: "CAT".to_string(),
            ..FilterCriteria::match_all()
        };
        assert!(criteria.matches(Path::new("/data/cat_01.png"), &meta(0, &[])));
        assert!(!criteria.matches(Path::new("/data/dog_01.png"), &meta(0, &[])));
    }

    #[test]
    fn test_filter_class_none_requires_empty() {
        let criteria = FilterCriteria {
            class_mode: ClassFilter::None,
            ..FilterCriteria::match_all()
        };
        let path = Path::new("img.png");
        assert!(criteria.matches(path, &meta(0, &[])));
        assert!(!criteria.matches(path, &meta(2, &[0, 1])));
    }

    #[test]
    fn test_filter_class_only_match_any_vs_all() {
        let path = Path::new("img.png");
        let selected: BTreeSet<u32> = [0, 1].into_iter().collect();

        let any = FilterCriteria {
            class_mode: ClassFilter::Only {
                classes: selected.clone(),
                match_all: false,
            },
            ..FilterCriteria::match_all()
        };
        // All present classes inside the set
        assert!(any.matches(path, &meta(2, &[0, 0])));
        // A class outside the set disqualifies
        assert!(!any.matches(path, &meta(2, &[0, 2])));

        let all = FilterCriteria {
            class_mode: ClassFilter::Only {
                classes: selected,
                match_all: true,
            },
            ..FilterCriteria::match_all()
        };
        assert!(!all.matches(path, &meta(2, &[0, 0])));
        assert!(all.matches(path, &meta(2, &[0, 1])));
    }

    #[test]
    fn test_metadata_from_text() {
        let text = "0 0.5 0.5 0.1 0.1\n3 0.2 0.2 0.3 0.2 0.3 0.3 0.2 0.3\nbroken line";
        let meta = metadata_from_text(text);
        assert_eq!(meta.count, 2);
        assert_eq!(meta.classes, vec![0, 3]);
    }

    #[test]
    fn test_label_path_sits_beside_image() {
        assert_eq!(
            label_path_for(Path::new("/data/set/img_007.jpg")),
            PathBuf::from("/data/set/img_007.txt")
        );
    }

    #[test]
    fn test_memory_kv_round_trip() {
        let mut kv = MemoryKeyValue::default();
        assert_eq!(kv.get("k"), None);
        kv.set("k", "v");
        assert_eq!(kv.get("k"), Some("v".to_string()));
        kv.remove("k");
        assert_eq!(kv.get("k"), None);
    }
}
