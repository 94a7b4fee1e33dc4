// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label text format: one annotation per line, normalized coordinates.
//!
//! Two line shapes are recognized by token count:
//! - 5 tokens: `class cx cy w h` (axis-aligned box)
//! - 9 tokens: `class x1 y1 x2 y2 x3 y3 x4 y4` (oriented box)
//!
//! Any other token count is a malformed line and is skipped rather than
//! failing the whole file; hand-edited label files are common. Floats are
//! written with 6 decimal places. Oriented boxes are re-ordered with the
//! anchor-preserving clockwise ordering on both load and save so repeated
//! round-trips never rotate the point list.

use crate::models::annotation::{Annotation, LabelKind, Point};
use crate::util::geometry;

/// Parse label text into annotations plus the shape kind new annotations
/// should default to on this image (oriented wins if any line is oriented).
pub fn parse_labels(text: &str) -> (Vec<Annotation>, LabelKind) {
    let mut annotations = Vec::new();
    let mut kind = LabelKind::BBox;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(ann) => {
                if matches!(ann, Annotation::Obb { .. }) {
                    kind = LabelKind::Obb;
                }
                annotations.push(ann);
            }
            None => log::warn!("Skipping malformed label line: {:?}", line),
        }
    }
    (annotations, kind)
}

/// Parse a single label line.
fn parse_line(line: &str) -> Option<Annotation> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let class: u32 = tokens.first()?.parse().ok()?;
    let floats: Option<Vec<f64>> = tokens[1..].iter().map(|t| t.parse().ok()).collect();
    let floats = floats?;

    match floats.len() {
        4 => Some(Annotation::BBox {
            class,
            cx: floats[0],
            cy: floats[1],
            w: floats[2],
            h: floats[3],
        }),
        8 => {
            let points = [
                Point::new(floats[0], floats[1]),
                Point::new(floats[2], floats[3]),
                Point::new(floats[4], floats[5]),
                Point::new(floats[6], floats[7]),
            ];
            Some(Annotation::Obb {
                class,
                points: geometry::order_points_clockwise_preserve_anchor(points),
            })
        }
        _ => None,
    }
}

/// Serialize annotations to label text, one line per annotation.
pub fn serialize_labels(annotations: &[Annotation]) -> String {
    let lines: Vec<String> = annotations.iter().map(serialize_line).collect();
    lines.join("\n")
}

fn serialize_line(annotation: &Annotation) -> String {
    match annotation {
        Annotation::BBox { class, cx, cy, w, h } => {
            format!("{} {:.6} {:.6} {:.6} {:.6}", class, cx, cy, w, h)
        }
        Annotation::Obb { class, points } => {
            let p = geometry::order_points_clockwise_preserve_anchor(*points);
            format!(
                "{} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
                class, p[0].x, p[0].y, p[1].x, p[1].y, p[2].x, p[2].y, p[3].x, p[3].y
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_line_round_trip() {
        let ann = Annotation::BBox {
            class: 2,
            cx: 0.2,
            cy: 0.2,
            w: 0.2,
            h: 0.2,
        };
        let text = serialize_labels(&[ann.clone()]);
        assert_eq!(text, "2 0.200000 0.200000 0.200000 0.200000");

        let (parsed, kind) = parse_labels(&text);
        assert_eq!(parsed, vec![ann]);
        assert_eq!(kind, LabelKind::BBox);
    }

    #[test]
    fn test_obb_round_trip_preserves_point_order() {
        let points = [
            Point::new(0.3, 0.1),
            Point::new(0.4, 0.2),
            Point::new(0.3, 0.3),
            Point::new(0.2, 0.2),
        ];
        let ann = Annotation::Obb { class: 0, points };
        let first = serialize_labels(&[ann]);
        let (parsed, kind) = parse_labels(&first);
        assert_eq!(kind, LabelKind::Obb);
        let second = serialize_labels(&parsed);
        assert_eq!(first, second);

        // First point survives the round-trip
        match &parsed[0] {
            Annotation::Obb { points: p, .. } => assert_eq!(p[0], points[0]),
            _ => panic!("expected oriented box"),
        }
    }

    #[test]
    fn test_loaded_ccw_obb_keeps_anchor() {
        // Counter-clockwise file: winding gets fixed, anchor stays first
        let text = "1 0.200000 0.200000 0.200000 0.100000 0.100000 0.100000 0.100000 0.200000";
        let (parsed, _) = parse_labels(text);
        match &parsed[0] {
            Annotation::Obb { points, .. } => {
                assert_eq!(points[0], Point::new(0.2, 0.2));
                assert!(geometry::signed_area(points) > 0.0);
            }
            _ => panic!("expected oriented box"),
        }
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "0 0.5 0.5 0.1 0.1\nnot a label\n1 0.5 0.5\n\n2 0.1 0.1 0.2 0.1 0.2 0.2 0.1 0.2";
        let (parsed, kind) = parse_labels(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(kind, LabelKind::Obb);
    }

    #[test]
    fn test_empty_text_is_zero_annotations() {
        let (parsed, kind) = parse_labels("");
        assert!(parsed.is_empty());
        assert_eq!(kind, LabelKind::BBox);
    }

    #[test]
    fn test_six_decimal_places() {
        let ann = Annotation::BBox {
            class: 0,
            cx: 1.0 / 3.0,
            cy: 0.5,
            w: 0.125,
            h: 0.1,
        };
        let line = serialize_labels(&[ann]);
        assert_eq!(line, "0 0.333333 0.500000 0.125000 0.100000");
    }
}
