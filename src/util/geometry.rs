// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Pure point/polygon math used by the annotation editor: winding and
//! point-ordering for oriented boxes, rotation about a pivot, and
//! containment tests. All coordinates are normalized image space
//! (y grows downward), so a positive shoelace sum means clockwise.

use crate::models::annotation::Point;

/// Signed area of a polygon via the shoelace sum.
///
/// Positive for clockwise winding in y-down raster space.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Centroid of a polygon's vertices (vertex mean).
pub fn polygon_centroid(points: &[Point]) -> Point {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Order four points clockwise with a deterministic start corner.
///
/// Sorts by polar angle about the centroid (ascending angle is clockwise
/// in y-down space), fixes winding by the signed area, then rotates the
/// list so the point with minimum y (tie-break minimum x) comes first.
/// Applied once at creation time; idempotent.
pub fn order_points_clockwise_canonical(points: [Point; 4]) -> [Point; 4] {
    let centroid = polygon_centroid(&points);
    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| {
        let aa = (a.y - centroid.y).atan2(a.x - centroid.x);
        let ab = (b.y - centroid.y).atan2(b.x - centroid.x);
        aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
    });
    if signed_area(&ordered) < 0.0 {
        ordered.reverse();
    }

    let first = ordered
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (a.y, a.x)
                .partial_cmp(&(b.y, b.x))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    ordered.rotate_left(first);

    [ordered[0], ordered[1], ordered[2], ordered[3]]
}

/// Guarantee clockwise winding while keeping the original first point first.
///
/// Loaded shapes keep whatever start corner the file had; this only fixes
/// winding so repeated load/save cycles never renumber the corners.
pub fn order_points_clockwise_preserve_anchor(points: [Point; 4]) -> [Point; 4] {
    if signed_area(&points) >= 0.0 {
        return points;
    }
    let anchor = points[0];
    let mut reversed = points.to_vec();
    reversed.reverse();
    let first = reversed
        .iter()
        .position(|p| p.x == anchor.x && p.y == anchor.y)
        .unwrap_or(0);
    reversed.rotate_left(first);
    [reversed[0], reversed[1], reversed[2], reversed[3]]
}

/// Rotate a point about an arbitrary pivot by `angle` radians.
pub fn rotate_point(p: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Rotate every point in a slice about a shared pivot.
pub fn rotate_points(points: &mut [Point], center: Point, angle: f64) {
    for p in points.iter_mut() {
        *p = rotate_point(*p, center, angle);
    }
}

/// Ray-casting point-in-polygon test (even-odd rule).
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Axis-aligned containment test.
pub fn point_in_rect(p: Point, min: Point, max: Point) -> bool {
    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
}

/// Axis-aligned rectangle overlap test.
pub fn rects_intersect(a_min: Point, a_max: Point, b_min: Point, b_max: Point) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> [Point; 4] {
        [
            Point::new(0.1, 0.1),
            Point::new(0.2, 0.1),
            Point::new(0.2, 0.2),
            Point::new(0.1, 0.2),
        ]
    }

    #[test]
    fn test_signed_area_clockwise_positive() {
        // Clockwise in y-down raster space
        assert!(signed_area(&square()) > 0.0);

        let mut ccw = square();
        ccw.reverse();
        assert!(signed_area(&ccw) < 0.0);
    }

    #[test]
    fn test_canonical_order_starts_top_left() {
        // Scrambled input, counter-clockwise winding
        let scrambled = [
            Point::new(0.2, 0.2),
            Point::new(0.2, 0.1),
            Point::new(0.1, 0.1),
            Point::new(0.1, 0.2),
        ];
        let ordered = order_points_clockwise_canonical(scrambled);
        assert_eq!(ordered, square());
    }

    #[test]
    fn test_canonical_order_idempotent() {
        let once = order_points_clockwise_canonical(square());
        let twice = order_points_clockwise_canonical(once);
        assert_eq!(once, twice);
        assert!(signed_area(&once) >= 0.0);
    }

    #[test]
    fn test_canonical_order_tie_break_min_x() {
        let ordered = order_points_clockwise_canonical(square());
        // Both top corners share y = 0.1; minimum x wins
        assert_eq!(ordered[0], Point::new(0.1, 0.1));
    }

    #[test]
    fn test_canonical_order_rotated_quad() {
        let rotated: Vec<Point> = square()
            .iter()
            .map(|p| rotate_point(*p, Point::new(0.15, 0.15), 0.3))
            .collect();
        let ordered =
            order_points_clockwise_canonical([rotated[2], rotated[0], rotated[3], rotated[1]]);
        assert!(signed_area(&ordered) > 0.0);
        // First point has minimum y among the four
        for p in &ordered[1..] {
            assert!(p.y >= ordered[0].y - 1e-12);
        }
    }

    #[test]
    fn test_anchor_preserved_on_reversal() {
        // Counter-clockwise input anchored at (0.2, 0.2)
        let ccw = [
            Point::new(0.2, 0.2),
            Point::new(0.2, 0.1),
            Point::new(0.1, 0.1),
            Point::new(0.1, 0.2),
        ];
        let fixed = order_points_clockwise_preserve_anchor(ccw);
        assert_eq!(fixed[0], Point::new(0.2, 0.2));
        assert!(signed_area(&fixed) > 0.0);
    }

    #[test]
    fn test_anchor_order_idempotent() {
        let once = order_points_clockwise_preserve_anchor(square());
        let twice = order_points_clockwise_preserve_anchor(once);
        assert_eq!(once, twice);
        // Already clockwise: untouched
        assert_eq!(once, square());
    }

    #[test]
    fn test_rotate_point_quarter_turn() {
        let center = Point::new(0.5, 0.5);
        let p = rotate_point(Point::new(0.6, 0.5), center, std::f64::consts::FRAC_PI_2);
        assert!((p.x - 0.5).abs() < 1e-9);
        assert!((p.y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_point_in_polygon() {
        let quad = square();
        assert!(point_in_polygon(Point::new(0.15, 0.15), &quad));
        assert!(!point_in_polygon(Point::new(0.25, 0.15), &quad));
        assert!(!point_in_polygon(Point::new(0.15, 0.05), &quad));
    }

    #[test]
    fn test_rects_intersect() {
        let a = (Point::new(0.0, 0.0), Point::new(0.5, 0.5));
        let b = (Point::new(0.4, 0.4), Point::new(0.9, 0.9));
        let c = (Point::new(0.6, 0.6), Point::new(0.9, 0.9));
        assert!(rects_intersect(a.0, a.1, b.0, b.1));
        assert!(!rects_intersect(a.0, a.1, c.0, c.1));
    }
}
