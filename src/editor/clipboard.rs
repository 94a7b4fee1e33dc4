// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation clipboard over the key-value slot.
//!
//! Copy serializes a structural clone of the selected annotations as JSON;
//! paste reads it back. A corrupt payload reads as an empty clipboard
//! rather than an error.

use crate::io::storage::KeyValueStore;
use crate::models::annotation::Annotation;

const CLIPBOARD_KEY: &str = "clipboard";

/// Store clones of the given annotations in the clipboard slot.
pub fn copy(kv: &mut dyn KeyValueStore, annotations: &[Annotation]) {
    match serde_json::to_string(annotations) {
        Ok(payload) => kv.set(CLIPBOARD_KEY, &payload),
        Err(e) => log::warn!("Failed to encode clipboard payload: {}", e),
    }
}

/// Read the clipboard contents; corrupt or missing payloads yield nothing.
pub fn paste(kv: &dyn KeyValueStore) -> Vec<Annotation> {
    let Some(payload) = kv.get(CLIPBOARD_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str(&payload) {
        Ok(annotations) => annotations,
        Err(e) => {
            log::warn!("Ignoring corrupt clipboard payload: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryKeyValue;
    use crate::models::annotation::Point;

    #[test]
    fn test_copy_paste_round_trip() {
        let mut kv = MemoryKeyValue::default();
        let items = vec![
            Annotation::BBox {
                class: 1,
                cx: 0.5,
                cy: 0.5,
                w: 0.2,
                h: 0.1,
            },
            Annotation::Obb {
                class: 0,
                points: [
                    Point::new(0.1, 0.1),
                    Point::new(0.2, 0.1),
                    Point::new(0.2, 0.2),
                    Point::new(0.1, 0.2),
                ],
            },
        ];
        copy(&mut kv, &items);
        assert_eq!(paste(&kv), items);
    }

    #[test]
    fn test_corrupt_payload_reads_empty() {
        let mut kv = MemoryKeyValue::default();
        kv.set(CLIPBOARD_KEY, "{not json");
        assert!(paste(&kv).is_empty());
    }

    #[test]
    fn test_missing_payload_reads_empty() {
        let kv = MemoryKeyValue::default();
        assert!(paste(&kv).is_empty());
    }
}
