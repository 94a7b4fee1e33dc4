// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the core shapes the editor manipulates: axis-aligned
//! bounding boxes (center + size) and oriented bounding boxes (four ordered
//! points). All coordinates are normalized to [0,1] relative to the image
//! width/height.

use crate::util::geometry;
use serde::{Deserialize, Serialize};

/// A 2D point with normalized coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which shape kind new annotations take on the current image.
///
/// Inferred from the loaded label file: any oriented line present means new
/// shapes default to oriented boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelKind {
    #[default]
    BBox,
    Obb,
}

/// An object annotation over the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    /// Axis-aligned box: center plus width/height.
    BBox {
        class: u32,
        cx: f64,
        cy: f64,
        w: f64,
        h: f64,
    },
    /// Oriented box: four points in clockwise order.
    Obb { class: u32, points: [Point; 4] },
}

impl Annotation {
    /// Class index of this annotation.
    pub fn class(&self) -> u32 {
        match self {
            Annotation::BBox { class, .. } | Annotation::Obb { class, .. } => *class,
        }
    }

    pub fn set_class(&mut self, new_class: u32) {
        match self {
            Annotation::BBox { class, .. } | Annotation::Obb { class, .. } => *class = new_class,
        }
    }

    /// Display name for a class index; unknown indices render as `class_<id>`.
    pub fn class_label(&self, class_names: &[String]) -> String {
        let id = self.class() as usize;
        class_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", id))
    }

    /// Geometric center.
    pub fn center(&self) -> Point {
        match self {
            Annotation::BBox { cx, cy, .. } => Point::new(*cx, *cy),
            Annotation::Obb { points, .. } => geometry::polygon_centroid(points),
        }
    }

    /// Axis-aligned bounding rectangle as (min, max).
    pub fn bounding_rect(&self) -> (Point, Point) {
        match self {
            Annotation::BBox { cx, cy, w, h, .. } => (
                Point::new(cx - w / 2.0, cy - h / 2.0),
                Point::new(cx + w / 2.0, cy + h / 2.0),
            ),
            Annotation::Obb { points, .. } => {
                let mut min = points[0];
                let mut max = points[0];
                for p in &points[1..] {
                    min.x = min.x.min(p.x);
                    min.y = min.y.min(p.y);
                    max.x = max.x.max(p.x);
                    max.y = max.y.max(p.y);
                }
                (min, max)
            }
        }
    }

    /// Containment test used for hit-testing.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Annotation::BBox { .. } => {
                let (min, max) = self.bounding_rect();
                geometry::point_in_rect(p, min, max)
            }
            Annotation::Obb { points, .. } => geometry::point_in_polygon(p, points),
        }
    }

    /// Corner points, clockwise from top-left for bboxes.
    pub fn corners(&self) -> [Point; 4] {
        match self {
            Annotation::BBox { .. } => {
                let (min, max) = self.bounding_rect();
                [
                    Point::new(min.x, min.y),
                    Point::new(max.x, min.y),
                    Point::new(max.x, max.y),
                    Point::new(min.x, max.y),
                ]
            }
            Annotation::Obb { points, .. } => *points,
        }
    }

    /// Points that decide membership in a drag-select rectangle:
    /// the center for a bbox, every vertex for an obb.
    pub fn defining_points(&self) -> Vec<Point> {
        match self {
            Annotation::BBox { cx, cy, .. } => vec![Point::new(*cx, *cy)],
            Annotation::Obb { points, .. } => points.to_vec(),
        }
    }

    /// Translate by a normalized delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Annotation::BBox { cx, cy, .. } => {
                *cx += dx;
                *cy += dy;
            }
            Annotation::Obb { points, .. } => {
                for p in points.iter_mut() {
                    p.x += dx;
                    p.y += dy;
                }
            }
        }
    }

    /// Remap geometry for a group resize: per-axis scale about `origin`.
    ///
    /// Centers move proportionally within the group rectangle; the shape
    /// itself scales with the same per-axis factors.
    pub fn scale_about(&mut self, origin: Point, sx: f64, sy: f64) {
        match self {
            Annotation::BBox { cx, cy, w, h, .. } => {
                *cx = origin.x + (*cx - origin.x) * sx;
                *cy = origin.y + (*cy - origin.y) * sy;
                *w *= sx.abs();
                *h *= sy.abs();
            }
            Annotation::Obb { points, .. } => {
                for p in points.iter_mut() {
                    p.x = origin.x + (p.x - origin.x) * sx;
                    p.y = origin.y + (p.y - origin.y) * sy;
                }
            }
        }
    }

    /// Rotate about a pivot. An axis-aligned box cannot tilt, so only its
    /// center orbits the pivot; oriented boxes rotate fully.
    pub fn rotate_about(&mut self, pivot: Point, angle: f64) {
        match self {
            Annotation::BBox { cx, cy, .. } => {
                let c = geometry::rotate_point(Point::new(*cx, *cy), pivot, angle);
                *cx = c.x;
                *cy = c.y;
            }
            Annotation::Obb { points, .. } => {
                geometry::rotate_points(points, pivot, angle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> Annotation {
        Annotation::BBox {
            class: 1,
            cx: 0.5,
            cy: 0.5,
            w: 0.2,
            h: 0.1,
        }
    }

    fn obb() -> Annotation {
        Annotation::Obb {
            class: 2,
            points: [
                Point::new(0.1, 0.1),
                Point::new(0.3, 0.1),
                Point::new(0.3, 0.2),
                Point::new(0.1, 0.2),
            ],
        }
    }

    #[test]
    fn test_bbox_containment() {
        let a = bbox();
        assert!(a.contains(Point::new(0.5, 0.5)));
        assert!(a.contains(Point::new(0.41, 0.46)));
        assert!(!a.contains(Point::new(0.39, 0.5)));
        assert!(!a.contains(Point::new(0.5, 0.56)));
    }

    #[test]
    fn test_obb_containment() {
        let a = obb();
        assert!(a.contains(Point::new(0.2, 0.15)));
        assert!(!a.contains(Point::new(0.35, 0.15)));
    }

    #[test]
    fn test_translate() {
        let mut a = bbox();
        a.translate(0.1, -0.2);
        assert_eq!(a.center(), Point::new(0.6, 0.3));

        let mut b = obb();
        b.translate(0.05, 0.05);
        let (min, _) = b.bounding_rect();
        assert!((min.x - 0.15).abs() < 1e-12);
        assert!((min.y - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_scale_about_doubles_bbox() {
        let mut a = Annotation::BBox {
            class: 0,
            cx: 0.3,
            cy: 0.3,
            w: 0.1,
            h: 0.1,
        };
        a.scale_about(Point::new(0.2, 0.2), 2.0, 2.0);
        match a {
            Annotation::BBox { cx, cy, w, h, .. } => {
                assert!((cx - 0.4).abs() < 1e-12);
                assert!((cy - 0.4).abs() < 1e-12);
                assert!((w - 0.2).abs() < 1e-12);
                assert!((h - 0.2).abs() < 1e-12);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_class_label_fallback() {
        let names = vec!["car".to_string(), "truck".to_string()];
        assert_eq!(bbox().class_label(&names), "truck");
        assert_eq!(obb().class_label(&names), "class_2");
    }
}
