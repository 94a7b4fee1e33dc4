// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image decoding for the preload pipeline.
//!
//! Decoding happens on background threads; results come back over an mpsc
//! channel and are drained on the UI thread each frame. A per-path
//! in-flight marker deduplicates requests so rapid navigation doesn't
//! decode the same image twice.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

/// RGBA pixels of a decoded raster.
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode an image file to RGBA.
pub fn load_image(path: &Path) -> Result<DecodedImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;
    let rgba = img.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

/// Decode and shrink an image so its longest edge is at most `max_size`.
pub fn load_thumbnail(path: &Path, max_size: u32) -> Result<DecodedImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?;
    let thumb = img.thumbnail(max_size, max_size).to_rgba8();
    Ok(DecodedImage {
        width: thumb.width(),
        height: thumb.height(),
        pixels: thumb.into_raw(),
    })
}

/// A completed background decode.
pub struct LoadResult {
    pub path: PathBuf,
    pub result: std::result::Result<DecodedImage, String>,
}

/// Background decoder with per-path request deduplication.
pub struct ImageLoader {
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
    in_flight: HashSet<PathBuf>,
    /// None decodes full size; Some(n) decodes a thumbnail
    max_size: Option<u32>,
}

impl ImageLoader {
    pub fn new(max_size: Option<u32>) -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            in_flight: HashSet::new(),
            max_size,
        }
    }

    /// Queue a decode unless one is already in flight for this path.
    pub fn request(&mut self, path: PathBuf) {
        if !self.in_flight.insert(path.clone()) {
            return;
        }
        let sender = self.sender.clone();
        let max_size = self.max_size;
        std::thread::spawn(move || {
            let result = match max_size {
                Some(n) => load_thumbnail(&path, n),
                None => load_image(&path),
            }
            .map_err(|e| e.to_string());
            let _ = sender.send(LoadResult { path, result });
        });
    }

    /// Queue decodes for a batch of paths (thumbnail strips).
    pub fn request_batch(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            self.request(path);
        }
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.contains(path)
    }

    /// Drain completed decodes, clearing their in-flight markers.
    pub fn poll(&mut self) -> Vec<LoadResult> {
        let mut done = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            self.in_flight.remove(&result.path);
            done.push(result);
        }
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_marker_deduplicates() {
        let mut loader = ImageLoader::new(None);
        let path = PathBuf::from("/nonexistent/img.png");
        loader.request(path.clone());
        assert!(loader.is_in_flight(&path));
        // Second request is a no-op while the first is pending
        loader.request(path.clone());

        // The decode fails (missing file) but still reports exactly once
        let mut results = Vec::new();
        for _ in 0..200 {
            results.extend(loader.poll());
            if !results.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(results.len(), 1);
        assert!(results[0].result.is_err());
        assert!(!loader.is_in_flight(&path));
    }
}
