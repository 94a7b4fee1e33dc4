// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and annotation.
//!
//! Translates raw egui pointer input into editor events, then paints the
//! image, the annotations with their class labels, selection handles, and
//! any in-progress gesture preview.

use crate::editor::events::{EditorEvent, Modifiers, PointerButton};
use crate::editor::interaction::{Editor, InteractionState, Tool};
use crate::models::annotation::{Annotation, Point};

/// Per-class stroke colors, cycled when a class id runs past the end.
const CLASS_COLORS: [egui::Color32; 8] = [
    egui::Color32::YELLOW,
    egui::Color32::LIGHT_BLUE,
    egui::Color32::LIGHT_GREEN,
    egui::Color32::LIGHT_RED,
    egui::Color32::GOLD,
    egui::Color32::from_rgb(221, 160, 221),
    egui::Color32::from_rgb(255, 165, 0),
    egui::Color32::from_rgb(64, 224, 208),
];

const SELECTION_COLOR: egui::Color32 = egui::Color32::WHITE;
const HANDLE_RADIUS: f32 = 4.0;

pub fn class_color(class: u32) -> egui::Color32 {
    CLASS_COLORS[class as usize % CLASS_COLORS.len()]
}

/// Display the canvas area: feed pointer input to the editor, then draw.
pub fn show(
    ui: &mut egui::Ui,
    editor: &mut Editor,
    texture: Option<&egui::TextureHandle>,
    image_size: Option<(u32, u32)>,
    class_names: &[String],
    line_width: f32,
    load_error: Option<&str>,
) {
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);
    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);
        let rect = ui.min_rect();

        if let Some(error) = load_error {
            ui.centered_and_justified(|ui| {
                ui.label(
                    egui::RichText::new(format!("Failed to load image: {}", error))
                        .color(egui::Color32::LIGHT_RED),
                );
            });
            return;
        }

        let (Some(texture), Some(size)) = (texture, image_size) else {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("Loading image...").color(egui::Color32::WHITE));
            });
            return;
        };

        editor.viewport.set_geometry(rect, size);

        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        for event in collect_events(ui, &response, rect) {
            editor.handle_event(event);
        }

        let painter = ui.painter_at(rect);
        painter.image(
            texture.id(),
            editor.viewport.image_rect(),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        for (i, annotation) in editor.store.annotations.iter().enumerate() {
            let selected = editor.store.is_selected(i);
            draw_annotation(
                &painter,
                editor,
                annotation,
                class_names,
                line_width,
                selected,
            );
        }

        draw_selection_handles(&painter, editor, line_width);
        draw_gesture_preview(&painter, ui, editor, line_width);
    });
}

/// Translate this frame's pointer input into editor events.
fn collect_events(ui: &egui::Ui, response: &egui::Response, rect: egui::Rect) -> Vec<EditorEvent> {
    let mut events = Vec::new();
    let hovered = response.hovered();

    ui.input(|i| {
        let pos = i.pointer.latest_pos().unwrap_or(rect.center());
        let modifiers = Modifiers {
            command: i.modifiers.command,
            shift: i.modifiers.shift,
        };

        if hovered {
            if i.pointer.button_pressed(egui::PointerButton::Primary) {
                events.push(EditorEvent::PointerDown {
                    pos,
                    button: PointerButton::Primary,
                    modifiers,
                });
            }
            if i.pointer.button_pressed(egui::PointerButton::Secondary)
                || i.pointer.button_pressed(egui::PointerButton::Middle)
            {
                events.push(EditorEvent::PointerDown {
                    pos,
                    button: PointerButton::Secondary,
                    modifiers,
                });
            }

            let scroll = i.raw_scroll_delta.y;
            let pinch = i.zoom_delta();
            if scroll.abs() > 0.0 {
                events.push(EditorEvent::Zoom {
                    pos,
                    factor: (scroll * 0.005).exp(),
                });
            } else if (pinch - 1.0).abs() > f32::EPSILON {
                events.push(EditorEvent::Zoom { pos, factor: pinch });
            }
        }

        // Moves and releases are delivered even outside the rect so a
        // gesture that leaves the canvas still finishes.
        if i.pointer.is_moving() {
            events.push(EditorEvent::PointerMove { pos });
        }
        if i.pointer.button_released(egui::PointerButton::Primary)
            || i.pointer.button_released(egui::PointerButton::Secondary)
            || i.pointer.button_released(egui::PointerButton::Middle)
        {
            events.push(EditorEvent::PointerUp { pos, modifiers });
        }
    });

    events
}

/// Draw one annotation's outline and class label.
fn draw_annotation(
    painter: &egui::Painter,
    editor: &Editor,
    annotation: &Annotation,
    class_names: &[String],
    line_width: f32,
    selected: bool,
) {
    let color = if selected {
        SELECTION_COLOR
    } else {
        class_color(annotation.class())
    };
    let corners = annotation.corners();
    let screen: Vec<egui::Pos2> = corners
        .iter()
        .map(|p| editor.viewport.to_canvas(*p))
        .collect();

    for i in 0..screen.len() {
        painter.line_segment(
            [screen[i], screen[(i + 1) % screen.len()]],
            egui::Stroke::new(line_width, color),
        );
    }

    // Class label above the topmost corner
    let top = screen
        .iter()
        .copied()
        .min_by(|a, b| a.y.total_cmp(&b.y))
        .unwrap_or(screen[0]);
    painter.text(
        top - egui::vec2(0.0, 2.0),
        egui::Align2::LEFT_BOTTOM,
        annotation.class_label(class_names),
        egui::FontId::proportional(12.0),
        class_color(annotation.class()),
    );
}

/// Corner handles on the primary shape or the group rectangle, plus the
/// rotate handle where rotation applies.
fn draw_selection_handles(painter: &egui::Painter, editor: &Editor, line_width: f32) {
    if let Some(rect) = editor.group_rect() {
        let min = editor.viewport.to_canvas(rect.0);
        let max = editor.viewport.to_canvas(rect.1);
        let group = egui::Rect::from_min_max(min, max);
        painter.rect_stroke(
            group,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::from_gray(180)),
        );
        for corner in [
            group.left_top(),
            group.right_top(),
            group.right_bottom(),
            group.left_bottom(),
        ] {
            draw_handle(painter, corner);
        }
        let handle = editor.group_rotate_handle_pos(rect);
        painter.line_segment(
            [egui::pos2(group.center().x, group.min.y), handle],
            egui::Stroke::new(1.0, egui::Color32::from_gray(180)),
        );
        draw_handle(painter, handle);
        return;
    }

    let Some(primary) = editor.store.primary() else {
        return;
    };
    let Some(annotation) = editor.store.annotations.get(primary) else {
        return;
    };
    for corner in annotation.corners() {
        draw_handle(painter, editor.viewport.to_canvas(corner));
    }
    if let Annotation::Obb { points, .. } = annotation {
        let handle = editor.rotate_handle_pos(points);
        let mid = Point::new(
            (points[0].x + points[1].x) / 2.0,
            (points[0].y + points[1].y) / 2.0,
        );
        painter.line_segment(
            [editor.viewport.to_canvas(mid), handle],
            egui::Stroke::new(line_width.min(1.5), egui::Color32::from_gray(180)),
        );
        draw_handle(painter, handle);
    }
}

fn draw_handle(painter: &egui::Painter, pos: egui::Pos2) {
    painter.circle_filled(pos, HANDLE_RADIUS, egui::Color32::WHITE);
    painter.circle_stroke(pos, HANDLE_RADIUS, egui::Stroke::new(1.0, egui::Color32::BLACK));
}

/// Preview for whatever gesture is in flight.
fn draw_gesture_preview(
    painter: &egui::Painter,
    ui: &egui::Ui,
    editor: &Editor,
    line_width: f32,
) {
    let hover = ui.input(|i| i.pointer.latest_pos());
    let preview_stroke = egui::Stroke::new(line_width, egui::Color32::LIGHT_BLUE);

    match editor.state() {
        InteractionState::DrawingRect { start, current } => {
            painter.rect_stroke(
                egui::Rect::from_two_pos(*start, *current),
                0.0,
                preview_stroke,
            );
        }
        InteractionState::TwoPointCreate { first } => {
            let anchor = editor.viewport.to_canvas(*first);
            if let Some(hover) = hover {
                painter.rect_stroke(egui::Rect::from_two_pos(anchor, hover), 0.0, preview_stroke);
            }
            draw_handle(painter, anchor);
        }
        InteractionState::CreatingQuad { points } => {
            let screen: Vec<egui::Pos2> = points
                .iter()
                .map(|p| editor.viewport.to_canvas(*p))
                .collect();
            for pair in screen.windows(2) {
                painter.line_segment([pair[0], pair[1]], preview_stroke);
            }
            if let (Some(last), Some(hover)) = (screen.last(), hover) {
                painter.line_segment([*last, hover], preview_stroke);
            }
            for p in &screen {
                draw_handle(painter, *p);
            }
        }
        InteractionState::BoxSelecting { start, current, .. } => {
            let rect = egui::Rect::from_two_pos(*start, *current);
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::from_gray(200)));
            painter.rect_filled(
                rect,
                0.0,
                egui::Color32::from_rgba_unmultiplied(200, 200, 255, 16),
            );
        }
        _ => {}
    }
}

// Tool hint shown under the canvas.
pub fn tool_hint(tool: Tool) -> &'static str {
    match tool {
        Tool::Select => "Click to select, drag to move, Shift+drag to box-select",
        Tool::DrawBox => "Drag a rectangle, or click two opposite corners",
        Tool::DrawQuad => "Click the four corners in order",
    }
}
