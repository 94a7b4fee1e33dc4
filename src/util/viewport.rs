// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Viewport mapping between canvas pixels and normalized image space.
//!
//! The image is letterboxed inside the canvas with a fit-to-container base
//! scale, then a user zoom factor and pan offset are applied on top. All
//! annotation geometry lives in normalized [0,1] coordinates; only this
//! module knows where those land on screen.

use crate::models::annotation::Point;

/// User zoom factor bounds.
pub const MIN_VIEW_SCALE: f32 = 0.2;
pub const MAX_VIEW_SCALE: f32 = 5.0;

/// Canvas/image coordinate mapping state.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Fit-to-container scale, recomputed when canvas or image size changes
    base_scale: f32,
    /// User zoom factor, clamped to [MIN_VIEW_SCALE, MAX_VIEW_SCALE]
    view_scale: f32,
    /// Pan offset in canvas pixels, applied after scaling
    offset: egui::Vec2,
    /// Canvas area in screen coordinates
    canvas_rect: egui::Rect,
    /// Image dimensions in pixels
    image_size: egui::Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base_scale: 1.0,
            view_scale: 1.0,
            offset: egui::Vec2::ZERO,
            canvas_rect: egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1.0, 1.0)),
            image_size: egui::vec2(1.0, 1.0),
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update canvas and image dimensions, refitting the base scale.
    ///
    /// Zoom and pan are preserved so panel resizes don't jump the view.
    pub fn set_geometry(&mut self, canvas_rect: egui::Rect, image_size: (u32, u32)) {
        self.canvas_rect = canvas_rect;
        self.image_size = egui::vec2(image_size.0.max(1) as f32, image_size.1.max(1) as f32);
        self.base_scale = (canvas_rect.width() / self.image_size.x)
            .min(canvas_rect.height() / self.image_size.y);
    }

    /// Reset zoom and pan (called on every image switch).
    pub fn reset_view(&mut self) {
        self.view_scale = 1.0;
        self.offset = egui::Vec2::ZERO;
    }

    /// Combined scale from normalized-image pixels to canvas pixels.
    pub fn scale(&self) -> f32 {
        self.base_scale * self.view_scale
    }

    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    /// On-screen rectangle currently occupied by the image.
    pub fn image_rect(&self) -> egui::Rect {
        let size = self.image_size * self.scale();
        let min = self.canvas_rect.min
            + (self.canvas_rect.size() - size) * 0.5
            + self.offset;
        egui::Rect::from_min_size(min, size)
    }

    /// Map a canvas position to normalized image coordinates.
    pub fn to_image(&self, pos: egui::Pos2) -> Point {
        let rect = self.image_rect();
        Point::new(
            ((pos.x - rect.min.x) / rect.width()) as f64,
            ((pos.y - rect.min.y) / rect.height()) as f64,
        )
    }

    /// Map a normalized image point to canvas coordinates.
    pub fn to_canvas(&self, p: Point) -> egui::Pos2 {
        let rect = self.image_rect();
        egui::pos2(
            rect.min.x + p.x as f32 * rect.width(),
            rect.min.y + p.y as f32 * rect.height(),
        )
    }

    /// Multiplicative zoom anchored at a canvas position.
    ///
    /// Adjusts the pan offset so the image point under the cursor does not
    /// move while the scale changes.
    pub fn zoom_at(&mut self, pos: egui::Pos2, factor: f32) {
        let anchor = self.to_image(pos);
        self.view_scale = (self.view_scale * factor).clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE);

        let size = self.image_size * self.scale();
        let letterbox = self.canvas_rect.min + (self.canvas_rect.size() - size) * 0.5;
        let target = letterbox + egui::vec2(anchor.x as f32 * size.x, anchor.y as f32 * size.y);
        self.offset = pos - target;
    }

    /// Accumulate a pan delta in canvas pixels.
    pub fn pan(&mut self, delta: egui::Vec2) {
        self.offset += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport_1000() -> Viewport {
        let mut vp = Viewport::new();
        vp.set_geometry(
            egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1000.0, 1000.0)),
            (1000, 1000),
        );
        vp
    }

    #[test]
    fn test_fit_scale_letterboxes_wide_canvas() {
        let mut vp = Viewport::new();
        vp.set_geometry(
            egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(2000.0, 1000.0)),
            (1000, 1000),
        );
        assert_eq!(vp.scale(), 1.0);
        // Image centered horizontally
        assert_eq!(vp.image_rect().min.x, 500.0);
        assert_eq!(vp.image_rect().min.y, 0.0);
    }

    #[test]
    fn test_round_trip_canvas_image() {
        let vp = viewport_1000();
        let pos = egui::pos2(250.0, 730.0);
        let img = vp.to_image(pos);
        let back = vp.to_canvas(img);
        assert!((back.x - pos.x).abs() < 1e-3);
        assert!((back.y - pos.y).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_keeps_cursor_point_fixed() {
        let mut vp = viewport_1000();
        let cursor = egui::pos2(300.0, 400.0);
        let before = vp.to_image(cursor);
        vp.zoom_at(cursor, 1.5);
        let after = vp.to_image(cursor);
        assert!((before.x - after.x).abs() < 1e-5);
        assert!((before.y - after.y).abs() < 1e-5);
        assert!((vp.view_scale() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = viewport_1000();
        vp.zoom_at(egui::pos2(500.0, 500.0), 100.0);
        assert_eq!(vp.view_scale(), MAX_VIEW_SCALE);
        vp.zoom_at(egui::pos2(500.0, 500.0), 1e-6);
        assert_eq!(vp.view_scale(), MIN_VIEW_SCALE);
    }

    #[test]
    fn test_pan_shifts_image_rect() {
        let mut vp = viewport_1000();
        let before = vp.image_rect();
        vp.pan(egui::vec2(13.0, -7.0));
        let after = vp.image_rect();
        assert_eq!(after.min.x - before.min.x, 13.0);
        assert_eq!(after.min.y - before.min.y, -7.0);
    }
}
