// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interaction state machine for the annotation canvas.
//!
//! Consumes synthetic pointer/keyboard events and drives one of several
//! mutually exclusive modes: rectangle drawing, two-point and four-point
//! creation, box selection, move/resize/rotate of a single shape, group
//! transforms over the multi-selection, and panning. Every mutating gesture
//! snapshots the store before its first change and commits to the undo
//! history on pointer-up only if the geometry actually changed.

use crate::editor::clipboard;
use crate::editor::events::{EditorEvent, Modifiers, PointerButton};
use crate::io::storage::KeyValueStore;
use crate::models::annotation::{Annotation, LabelKind, Point};
use crate::models::history::{History, Snapshot};
use crate::models::store::AnnotationStore;
use crate::util::geometry;
use crate::util::viewport::Viewport;

/// Pointer travel below this is a click, at or above it a drag.
pub const CLICK_DRAG_THRESHOLD_PX: f32 = 10.0;
/// Repeated clicks within this radius cycle through overlapping hits.
pub const CYCLE_TOLERANCE_PX: f32 = 5.0;
/// Pick radius around corner and rotate handles.
pub const HANDLE_HIT_PX: f32 = 8.0;
/// Rotate handle offset from the top edge midpoint, in canvas pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f32 = 24.0;
/// Shapes smaller than this on either axis are discarded as degenerate.
pub const MIN_SHAPE_PX: f32 = 5.0;
/// Keyboard rotation step (Q/E).
pub const KEY_ROTATE_STEP_DEG: f64 = 5.0;

/// Currently selected drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Select,
    /// Drag a rectangle, or click twice for two-point creation
    DrawBox,
    /// Click four corners in sequence
    DrawQuad,
}

/// What a pointer-down landed on, checked before plain hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleHit {
    Corner(usize, usize),
    Rotate(usize),
    GroupCorner(usize),
    GroupRotate,
}

/// The mutually exclusive interaction modes.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Pointer is down but click-vs-drag is still undecided
    Pressed {
        start: egui::Pos2,
        modifiers: Modifiers,
    },
    DrawingRect {
        start: egui::Pos2,
        current: egui::Pos2,
    },
    TwoPointCreate {
        first: Point,
    },
    CreatingQuad {
        points: Vec<Point>,
    },
    BoxSelecting {
        start: egui::Pos2,
        current: egui::Pos2,
        union: bool,
    },
    Moving {
        last: Point,
    },
    GroupMoving {
        last: Point,
    },
    Resizing {
        index: usize,
        corner: usize,
        origin: Annotation,
    },
    Rotating {
        index: usize,
        origin: Annotation,
        center: Point,
        start_angle: f64,
    },
    GroupResizing {
        corner: usize,
        rect: (Point, Point),
        origin: Vec<(usize, Annotation)>,
    },
    GroupRotating {
        center: Point,
        start_angle: f64,
        origin: Vec<(usize, Annotation)>,
    },
    Panning {
        last: egui::Pos2,
    },
}

/// Click-cycling memory: repeated clicks at the same spot walk down the
/// z-order of overlapping shapes instead of always picking the topmost.
#[derive(Debug, Default)]
struct ClickCycle {
    last_pos: Option<egui::Pos2>,
    cursor: usize,
    hit_count: usize,
}

impl ClickCycle {
    fn next(&mut self, pos: egui::Pos2, hit_count: usize) -> usize {
        let same_spot = self
            .last_pos
            .is_some_and(|p| p.distance(pos) <= CYCLE_TOLERANCE_PX);
        // The cycle resets whenever the stack under the cursor changes
        if same_spot && hit_count == self.hit_count {
            self.cursor = (self.cursor + 1) % hit_count;
        } else {
            self.cursor = 0;
        }
        self.last_pos = Some(pos);
        self.hit_count = hit_count;
        self.cursor
    }

    fn reset(&mut self) {
        self.last_pos = None;
        self.cursor = 0;
        self.hit_count = 0;
    }
}

/// The annotation editor for the active image.
pub struct Editor {
    pub store: AnnotationStore,
    pub history: History,
    pub viewport: Viewport,
    pub tool: Tool,
    /// Shape kind for new drag/two-point creations (inferred from the file)
    pub label_kind: LabelKind,
    /// Transient message for the status line
    pub status: Option<String>,
    state: InteractionState,
    gesture_base: Option<Snapshot>,
    click_cycle: ClickCycle,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            store: AnnotationStore::new(),
            history: History::new(),
            viewport: Viewport::new(),
            tool: Tool::Select,
            label_kind: LabelKind::BBox,
            status: None,
            state: InteractionState::Idle,
            gesture_base: None,
            click_cycle: ClickCycle::default(),
        }
    }

    /// Swap in the annotations of a newly activated image.
    pub fn load(&mut self, annotations: Vec<Annotation>, kind: LabelKind) {
        let active_class = self.store.active_class;
        self.store = AnnotationStore::from_annotations(annotations);
        self.store.active_class = active_class;
        self.history.clear();
        self.label_kind = kind;
        self.state = InteractionState::Idle;
        self.gesture_base = None;
        self.click_cycle.reset();
        self.viewport.reset_view();
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Feed one synthetic event through the state machine.
    pub fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::PointerDown {
                pos,
                button,
                modifiers,
            } => self.pointer_down(pos, button, modifiers),
            EditorEvent::PointerMove { pos } => self.pointer_move(pos),
            EditorEvent::PointerUp { pos, modifiers } => self.pointer_up(pos, modifiers),
            EditorEvent::Zoom { pos, factor } => self.viewport.zoom_at(pos, factor),
            EditorEvent::Cancel => self.cancel(),
            EditorEvent::DeleteSelection => self.delete_selection(),
            EditorEvent::SelectAll => self.store.select_all(),
            EditorEvent::RotateStep { clockwise } => self.rotate_step(clockwise),
        }
    }

    // -- pointer transitions ------------------------------------------------

    fn pointer_down(&mut self, pos: egui::Pos2, button: PointerButton, modifiers: Modifiers) {
        if button == PointerButton::Secondary {
            self.state = InteractionState::Panning { last: pos };
            return;
        }

        match (&self.state, self.tool) {
            (InteractionState::Idle, Tool::Select) => {
                if modifiers.shift {
                    self.state = InteractionState::BoxSelecting {
                        start: pos,
                        current: pos,
                        union: modifiers.command,
                    };
                } else if let Some(hit) = self.handle_at(pos) {
                    self.begin_handle_gesture(hit, pos);
                } else {
                    self.state = InteractionState::Pressed {
                        start: pos,
                        modifiers,
                    };
                }
            }
            (InteractionState::Idle, Tool::DrawBox | Tool::DrawQuad) => {
                self.state = InteractionState::Pressed {
                    start: pos,
                    modifiers,
                };
            }
            // Two-point and quad creation consume clicks on pointer-up
            _ => {}
        }
    }

    fn pointer_move(&mut self, pos: egui::Pos2) {
        match &mut self.state {
            InteractionState::Pressed { start, .. } => {
                let start = *start;
                if start.distance(pos) >= CLICK_DRAG_THRESHOLD_PX {
                    self.begin_drag(start, pos);
                }
            }
            InteractionState::DrawingRect { current, .. } => *current = pos,
            InteractionState::BoxSelecting { current, .. } => *current = pos,
            InteractionState::Panning { last } => {
                let delta = pos - *last;
                *last = pos;
                self.viewport.pan(delta);
            }
            InteractionState::Moving { last } => {
                let cur = self.viewport.to_image(pos);
                let (dx, dy) = (cur.x - last.x, cur.y - last.y);
                *last = cur;
                if let Some(primary) = self.store.primary() {
                    if let Some(ann) = self.store.annotations.get_mut(primary) {
                        ann.translate(dx, dy);
                    }
                }
            }
            InteractionState::GroupMoving { last } => {
                let cur = self.viewport.to_image(pos);
                let (dx, dy) = (cur.x - last.x, cur.y - last.y);
                *last = cur;
                let selected = self.store.multi().to_vec();
                for i in selected {
                    if let Some(ann) = self.store.annotations.get_mut(i) {
                        ann.translate(dx, dy);
                    }
                }
            }
            InteractionState::Resizing {
                index,
                corner,
                origin,
            } => {
                let (index, corner, origin) = (*index, *corner, origin.clone());
                let target = self.viewport.to_image(pos);
                let resized = resize_annotation(&origin, corner, target);
                if let Some(ann) = self.store.annotations.get_mut(index) {
                    *ann = resized;
                }
            }
            InteractionState::Rotating {
                index,
                origin,
                center,
                start_angle,
            } => {
                let (index, origin, center, start_angle) =
                    (*index, origin.clone(), *center, *start_angle);
                let cur = self.viewport.to_image(pos);
                let angle = (cur.y - center.y).atan2(cur.x - center.x) - start_angle;
                let mut rotated = origin;
                rotated.rotate_about(center, angle);
                if let Some(ann) = self.store.annotations.get_mut(index) {
                    *ann = rotated;
                }
            }
            InteractionState::GroupResizing {
                corner,
                rect,
                origin,
            } => {
                let (corner, rect, origin) = (*corner, *rect, origin.clone());
                let target = self.viewport.to_image(pos);
                let fixed = opposite_rect_corner(rect, corner);
                let moving = rect_corner(rect, corner);
                let (dx, dy) = (moving.x - fixed.x, moving.y - fixed.y);
                if dx.abs() < f64::EPSILON || dy.abs() < f64::EPSILON {
                    return;
                }
                let sx = (target.x - fixed.x) / dx;
                let sy = (target.y - fixed.y) / dy;
                for (i, base) in origin {
                    let mut ann = base;
                    ann.scale_about(fixed, sx, sy);
                    if let Some(slot) = self.store.annotations.get_mut(i) {
                        *slot = ann;
                    }
                }
            }
            InteractionState::GroupRotating {
                center,
                start_angle,
                origin,
            } => {
                let (center, start_angle, origin) = (*center, *start_angle, origin.clone());
                let cur = self.viewport.to_image(pos);
                let angle = (cur.y - center.y).atan2(cur.x - center.x) - start_angle;
                for (i, base) in origin {
                    let mut ann = base;
                    ann.rotate_about(center, angle);
                    if let Some(slot) = self.store.annotations.get_mut(i) {
                        *slot = ann;
                    }
                }
            }
            InteractionState::Idle
            | InteractionState::TwoPointCreate { .. }
            | InteractionState::CreatingQuad { .. } => {}
        }
    }

    fn pointer_up(&mut self, pos: egui::Pos2, _modifiers: Modifiers) {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Pressed { start, modifiers } => self.click(start, modifiers),
            InteractionState::DrawingRect { start, .. } => {
                self.finish_rect(self.viewport.to_image(start), self.viewport.to_image(pos));
            }
            InteractionState::TwoPointCreate { first } => {
                self.finish_rect(first, self.viewport.to_image(pos));
            }
            InteractionState::CreatingQuad { mut points } => {
                points.push(self.viewport.to_image(pos));
                if points.len() >= 4 {
                    self.finish_quad([points[0], points[1], points[2], points[3]]);
                } else {
                    self.state = InteractionState::CreatingQuad { points };
                }
            }
            InteractionState::BoxSelecting {
                start,
                current: _,
                union,
            } => {
                self.apply_box_selection(start, pos, union);
            }
            InteractionState::Moving { .. } | InteractionState::GroupMoving { .. } => {
                self.commit_gesture();
            }
            InteractionState::Resizing { index, .. } => {
                if self.is_degenerate(index) {
                    self.cancel_gesture();
                } else {
                    self.commit_gesture();
                }
            }
            InteractionState::GroupResizing { origin, .. } => {
                if origin.iter().any(|&(i, _)| self.is_degenerate(i)) {
                    self.cancel_gesture();
                } else {
                    self.commit_gesture();
                }
            }
            InteractionState::Rotating { .. } | InteractionState::GroupRotating { .. } => {
                self.commit_gesture();
            }
            InteractionState::Panning { .. } | InteractionState::Idle => {}
        }
    }

    /// A primary-button press that never traveled far enough to be a drag.
    fn click(&mut self, pos: egui::Pos2, modifiers: Modifiers) {
        match self.tool {
            Tool::Select => {
                let p = self.viewport.to_image(pos);
                let hits = self.hits_at(p);
                if modifiers.command {
                    if let Some(&top) = hits.first() {
                        self.store.toggle_selection(top);
                    }
                    self.click_cycle.reset();
                } else if hits.is_empty() {
                    self.store.clear_selection();
                    self.click_cycle.reset();
                } else {
                    let cursor = self.click_cycle.next(pos, hits.len());
                    self.store.select_only(hits[cursor]);
                }
            }
            Tool::DrawBox => {
                self.state = InteractionState::TwoPointCreate {
                    first: self.viewport.to_image(pos),
                };
            }
            Tool::DrawQuad => {
                self.state = InteractionState::CreatingQuad {
                    points: vec![self.viewport.to_image(pos)],
                };
            }
        }
    }

    /// A press crossed the drag threshold; decide what kind of drag it is.
    fn begin_drag(&mut self, start: egui::Pos2, pos: egui::Pos2) {
        match self.tool {
            Tool::DrawBox => {
                self.state = InteractionState::DrawingRect {
                    start,
                    current: pos,
                };
            }
            Tool::DrawQuad => {
                // Quad corners are placed by clicks; a drag places the first
                // corner where the press started.
                self.state = InteractionState::CreatingQuad {
                    points: vec![self.viewport.to_image(start)],
                };
            }
            Tool::Select => {
                let p = self.viewport.to_image(start);
                let hit = self.hits_at(p).first().copied();
                let Some(hit) = hit else {
                    // Drag over empty canvas selects nothing
                    self.state = InteractionState::Idle;
                    return;
                };
                self.begin_gesture();
                if self.store.multi().len() > 1 && self.store.is_selected(hit) {
                    self.state = InteractionState::GroupMoving { last: p };
                } else {
                    self.store.select_only(hit);
                    self.state = InteractionState::Moving { last: p };
                }
                self.pointer_move(pos);
            }
        }
    }

    /// Enter a resize/rotate mode from a handle hit.
    fn begin_handle_gesture(&mut self, hit: HandleHit, pos: egui::Pos2) {
        self.begin_gesture();
        match hit {
            HandleHit::Corner(index, corner) => {
                if let Some(origin) = self.store.annotations.get(index).cloned() {
                    self.state = InteractionState::Resizing {
                        index,
                        corner,
                        origin,
                    };
                }
            }
            HandleHit::Rotate(index) => {
                if let Some(origin) = self.store.annotations.get(index).cloned() {
                    let center = origin.center();
                    let p = self.viewport.to_image(pos);
                    let start_angle = (p.y - center.y).atan2(p.x - center.x);
                    self.state = InteractionState::Rotating {
                        index,
                        origin,
                        center,
                        start_angle,
                    };
                }
            }
            HandleHit::GroupCorner(corner) => {
                if let Some(rect) = self.group_rect() {
                    let origin = self.selected_clones();
                    self.state = InteractionState::GroupResizing {
                        corner,
                        rect,
                        origin,
                    };
                }
            }
            HandleHit::GroupRotate => {
                if let Some(rect) = self.group_rect() {
                    let center = Point::new(
                        (rect.0.x + rect.1.x) / 2.0,
                        (rect.0.y + rect.1.y) / 2.0,
                    );
                    let p = self.viewport.to_image(pos);
                    let start_angle = (p.y - center.y).atan2(p.x - center.x);
                    self.state = InteractionState::GroupRotating {
                        center,
                        start_angle,
                        origin: self.selected_clones(),
                    };
                }
            }
        }
    }

    // -- creation ------------------------------------------------------------

    fn finish_rect(&mut self, a: Point, b: Point) {
        let a_px = self.viewport.to_canvas(a);
        let b_px = self.viewport.to_canvas(b);
        if (a_px.x - b_px.x).abs() < MIN_SHAPE_PX || (a_px.y - b_px.y).abs() < MIN_SHAPE_PX {
            log::debug!("Discarding degenerate rectangle");
            return;
        }

        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        let class = self.store.active_class;
        let annotation = match self.label_kind {
            LabelKind::BBox => Annotation::BBox {
                class,
                cx: (min_x + max_x) / 2.0,
                cy: (min_y + max_y) / 2.0,
                w: max_x - min_x,
                h: max_y - min_y,
            },
            LabelKind::Obb => Annotation::Obb {
                class,
                points: geometry::order_points_clockwise_canonical([
                    Point::new(min_x, min_y),
                    Point::new(max_x, min_y),
                    Point::new(max_x, max_y),
                    Point::new(min_x, max_y),
                ]),
            },
        };

        let base = Snapshot::of(&self.store);
        self.store.push_and_select(annotation);
        self.history.commit(base, &self.store);
        log::info!("Created annotation, total: {}", self.store.annotations.len());
    }

    fn finish_quad(&mut self, points: [Point; 4]) {
        let ordered = geometry::order_points_clockwise_canonical(points);
        let (min, max) = Annotation::Obb {
            class: 0,
            points: ordered,
        }
        .bounding_rect();
        let min_px = self.viewport.to_canvas(min);
        let max_px = self.viewport.to_canvas(max);
        if (max_px.x - min_px.x) < MIN_SHAPE_PX || (max_px.y - min_px.y) < MIN_SHAPE_PX {
            log::debug!("Discarding degenerate quadrilateral");
            return;
        }

        let base = Snapshot::of(&self.store);
        self.store.push_and_select(Annotation::Obb {
            class: self.store.active_class,
            points: ordered,
        });
        self.history.commit(base, &self.store);
    }

    // -- selection -----------------------------------------------------------

    /// Annotation indices under a point, topmost (highest index) first.
    fn hits_at(&self, p: Point) -> Vec<usize> {
        self.store
            .annotations
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, a)| a.contains(p))
            .map(|(i, _)| i)
            .collect()
    }

    fn apply_box_selection(&mut self, start: egui::Pos2, end: egui::Pos2, union: bool) {
        let a = self.viewport.to_image(start);
        let b = self.viewport.to_image(end);
        let min = Point::new(a.x.min(b.x), a.y.min(b.y));
        let max = Point::new(a.x.max(b.x), a.y.max(b.y));

        let inside: Vec<usize> = self
            .store
            .annotations
            .iter()
            .enumerate()
            .filter(|(_, ann)| {
                ann.defining_points()
                    .iter()
                    .any(|p| geometry::point_in_rect(*p, min, max))
            })
            .map(|(i, _)| i)
            .collect();

        if union {
            self.store.union_selection(inside);
        } else {
            self.store.select_set(inside);
        }
        self.click_cycle.reset();
    }

    // -- commands ------------------------------------------------------------

    fn cancel(&mut self) {
        match &self.state {
            InteractionState::Idle => {
                self.store.clear_selection();
                self.click_cycle.reset();
            }
            InteractionState::Moving { .. }
            | InteractionState::GroupMoving { .. }
            | InteractionState::Resizing { .. }
            | InteractionState::Rotating { .. }
            | InteractionState::GroupResizing { .. }
            | InteractionState::GroupRotating { .. } => {
                self.cancel_gesture();
            }
            // Creation and box-select gestures vanish without a trace
            _ => {
                self.state = InteractionState::Idle;
                self.gesture_base = None;
            }
        }
    }

    fn delete_selection(&mut self) {
        if !self.store.has_selection() {
            return;
        }
        let base = Snapshot::of(&self.store);
        let removed = self.store.delete_selected();
        self.history.commit(base, &self.store);
        self.click_cycle.reset();
        log::info!(
            "Deleted {} annotations, total: {}",
            removed,
            self.store.annotations.len()
        );
    }

    fn rotate_step(&mut self, clockwise: bool) {
        let selected = self.store.multi().to_vec();
        let has_obb = selected.iter().any(|&i| {
            matches!(
                self.store.annotations.get(i),
                Some(Annotation::Obb { .. })
            )
        });
        if !has_obb {
            return;
        }

        let angle = if clockwise {
            KEY_ROTATE_STEP_DEG.to_radians()
        } else {
            -KEY_ROTATE_STEP_DEG.to_radians()
        };
        let center = if selected.len() > 1 {
            self.group_rect()
                .map(|(min, max)| Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0))
        } else {
            selected
                .first()
                .and_then(|&i| self.store.annotations.get(i))
                .map(|a| a.center())
        };
        let Some(center) = center else { return };

        let base = Snapshot::of(&self.store);
        for i in selected {
            // Axis-aligned boxes are rotation-less
            if let Some(ann @ Annotation::Obb { .. }) = self.store.annotations.get_mut(i) {
                ann.rotate_about(center, angle);
            }
        }
        if self.history.commit(base, &self.store) {
            self.store.mark_dirty();
        }
    }

    /// Copy the selected annotations to the clipboard slot.
    pub fn copy_selection(&mut self, kv: &mut dyn KeyValueStore) {
        let selected: Vec<Annotation> = self
            .store
            .multi()
            .iter()
            .filter_map(|&i| self.store.annotations.get(i).cloned())
            .collect();
        if selected.is_empty() {
            return;
        }
        self.status = Some(format!("Copied {} annotations", selected.len()));
        clipboard::copy(kv, &selected);
    }

    /// Paste clipboard clones and select the inserted range.
    pub fn paste_clipboard(&mut self, kv: &dyn KeyValueStore) {
        let items = clipboard::paste(kv);
        if items.is_empty() {
            self.status = Some("Clipboard is empty".to_string());
            return;
        }
        let base = Snapshot::of(&self.store);
        let count = items.len();
        self.store.append_and_select(items);
        self.history.commit(base, &self.store);
        self.status = Some(format!("Pasted {} annotations", count));
    }

    pub fn undo(&mut self) {
        if let Some(previous) = self.history.undo(Snapshot::of(&self.store)) {
            previous.restore(&mut self.store);
            self.store.mark_dirty();
            self.click_cycle.reset();
            log::info!("Undo");
        }
    }

    pub fn redo(&mut self) {
        if let Some(next) = self.history.redo(Snapshot::of(&self.store)) {
            next.restore(&mut self.store);
            self.store.mark_dirty();
            self.click_cycle.reset();
            log::info!("Redo");
        }
    }

    /// Reassign the class of every selected annotation.
    pub fn assign_class(&mut self, class: u32) {
        if !self.store.has_selection() {
            return;
        }
        let base = Snapshot::of(&self.store);
        let selected = self.store.multi().to_vec();
        for i in selected {
            if let Some(ann) = self.store.annotations.get_mut(i) {
                ann.set_class(class);
            }
        }
        if self.history.commit(base, &self.store) {
            self.store.mark_dirty();
        }
    }

    // -- gesture bookkeeping ---------------------------------------------------

    fn begin_gesture(&mut self) {
        self.gesture_base = Some(Snapshot::of(&self.store));
    }

    fn commit_gesture(&mut self) {
        if let Some(base) = self.gesture_base.take() {
            if self.history.commit(base, &self.store) {
                self.store.mark_dirty();
            }
        }
    }

    fn cancel_gesture(&mut self) {
        if let Some(base) = self.gesture_base.take() {
            base.restore(&mut self.store);
        }
        self.state = InteractionState::Idle;
    }

    fn is_degenerate(&self, index: usize) -> bool {
        let Some(ann) = self.store.annotations.get(index) else {
            return true;
        };
        let (min, max) = ann.bounding_rect();
        let min_px = self.viewport.to_canvas(min);
        let max_px = self.viewport.to_canvas(max);
        (max_px.x - min_px.x) < MIN_SHAPE_PX || (max_px.y - min_px.y) < MIN_SHAPE_PX
    }

    fn selected_clones(&self) -> Vec<(usize, Annotation)> {
        self.store
            .multi()
            .iter()
            .filter_map(|&i| self.store.annotations.get(i).cloned().map(|a| (i, a)))
            .collect()
    }

    // -- handle geometry (shared with the renderer) ----------------------------

    /// Union bounding rectangle of the multi-selection, when it has 2+ members.
    pub fn group_rect(&self) -> Option<(Point, Point)> {
        if self.store.multi().len() < 2 {
            return None;
        }
        let mut rect: Option<(Point, Point)> = None;
        for &i in self.store.multi() {
            let Some(ann) = self.store.annotations.get(i) else {
                continue;
            };
            let (min, max) = ann.bounding_rect();
            rect = Some(match rect {
                None => (min, max),
                Some((rmin, rmax)) => (
                    Point::new(rmin.x.min(min.x), rmin.y.min(min.y)),
                    Point::new(rmax.x.max(max.x), rmax.y.max(max.y)),
                ),
            });
        }
        rect
    }

    /// Canvas position of the rotate handle for an oriented box: offset from
    /// the first-edge midpoint along its outward normal.
    pub fn rotate_handle_pos(&self, points: &[Point; 4]) -> egui::Pos2 {
        let mid = Point::new(
            (points[0].x + points[1].x) / 2.0,
            (points[0].y + points[1].y) / 2.0,
        );
        let centroid = geometry::polygon_centroid(points);
        let mid_px = self.viewport.to_canvas(mid);
        let centroid_px = self.viewport.to_canvas(centroid);
        let dir = (mid_px - centroid_px).normalized();
        mid_px + dir * ROTATE_HANDLE_OFFSET_PX
    }

    /// Canvas position of the group rotate handle: above the top edge midpoint.
    pub fn group_rotate_handle_pos(&self, rect: (Point, Point)) -> egui::Pos2 {
        let top_mid = Point::new((rect.0.x + rect.1.x) / 2.0, rect.0.y);
        self.viewport.to_canvas(top_mid) - egui::vec2(0.0, ROTATE_HANDLE_OFFSET_PX)
    }

    /// What handle, if any, sits under a canvas position.
    fn handle_at(&self, pos: egui::Pos2) -> Option<HandleHit> {
        if let Some(rect) = self.group_rect() {
            for (corner, p) in rect_corners(rect).iter().enumerate() {
                if self.viewport.to_canvas(*p).distance(pos) <= HANDLE_HIT_PX {
                    return Some(HandleHit::GroupCorner(corner));
                }
            }
            if self.group_rotate_handle_pos(rect).distance(pos) <= HANDLE_HIT_PX {
                return Some(HandleHit::GroupRotate);
            }
            return None;
        }

        let index = self.store.primary()?;
        let ann = self.store.annotations.get(index)?;
        for (corner, p) in ann.corners().iter().enumerate() {
            if self.viewport.to_canvas(*p).distance(pos) <= HANDLE_HIT_PX {
                return Some(HandleHit::Corner(index, corner));
            }
        }
        if let Annotation::Obb { points, .. } = ann {
            if self.rotate_handle_pos(points).distance(pos) <= HANDLE_HIT_PX {
                return Some(HandleHit::Rotate(index));
            }
        }
        None
    }
}

// -- resize math ---------------------------------------------------------------

fn rect_corners(rect: (Point, Point)) -> [Point; 4] {
    let (min, max) = rect;
    [
        Point::new(min.x, min.y),
        Point::new(max.x, min.y),
        Point::new(max.x, max.y),
        Point::new(min.x, max.y),
    ]
}

fn rect_corner(rect: (Point, Point), corner: usize) -> Point {
    rect_corners(rect)[corner % 4]
}

fn opposite_rect_corner(rect: (Point, Point), corner: usize) -> Point {
    rect_corners(rect)[(corner + 2) % 4]
}

/// Resize a single annotation by dragging one corner to `target`.
///
/// A bbox keeps the two unmoved corners fixed and recomputes center/size.
/// A rectangular obb fixes the opposite corner and projects the drag onto
/// the original edge directions, so it stays a true rectangle; a free-form
/// quadrilateral moves the dragged corner alone.
fn resize_annotation(origin: &Annotation, corner: usize, target: Point) -> Annotation {
    match origin {
        Annotation::BBox { class, .. } => {
            let fixed = origin.corners()[(corner + 2) % 4];
            Annotation::BBox {
                class: *class,
                cx: (fixed.x + target.x) / 2.0,
                cy: (fixed.y + target.y) / 2.0,
                w: (target.x - fixed.x).abs(),
                h: (target.y - fixed.y).abs(),
            }
        }
        Annotation::Obb { class, points } => {
            let mut out = *points;
            if is_rectangular(points) {
                let j = (corner + 2) % 4;
                let a = (corner + 1) % 4;
                let b = (corner + 3) % 4;
                let fixed = points[j];
                let u = unit(points[a].x - fixed.x, points[a].y - fixed.y);
                let v = unit(points[b].x - fixed.x, points[b].y - fixed.y);
                let (dx, dy) = (target.x - fixed.x, target.y - fixed.y);
                let along_u = dx * u.x + dy * u.y;
                let along_v = dx * v.x + dy * v.y;
                out[a] = Point::new(fixed.x + u.x * along_u, fixed.y + u.y * along_u);
                out[b] = Point::new(fixed.x + v.x * along_v, fixed.y + v.y * along_v);
                out[corner] = Point::new(
                    fixed.x + u.x * along_u + v.x * along_v,
                    fixed.y + u.y * along_u + v.y * along_v,
                );
            } else {
                out[corner] = target;
            }
            Annotation::Obb {
                class: *class,
                points: out,
            }
        }
    }
}

fn unit(x: f64, y: f64) -> Point {
    let len = (x * x + y * y).sqrt();
    if len < f64::EPSILON {
        Point::new(0.0, 0.0)
    } else {
        Point::new(x / len, y / len)
    }
}

/// True when the quad's corners form right angles (within tolerance).
fn is_rectangular(points: &[Point; 4]) -> bool {
    for i in 0..4 {
        let p = points[i];
        let prev = points[(i + 3) % 4];
        let next = points[(i + 1) % 4];
        let dot = (prev.x - p.x) * (next.x - p.x) + (prev.y - p.y) * (next.y - p.y);
        if dot.abs() > 1e-9 {
            return false;
        }
    }
    true
}
