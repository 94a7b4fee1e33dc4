// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Synthetic input events for the interaction state machine.
//!
//! The canvas translates egui input into these, and tests feed them in
//! directly, so the state machine never depends on where events come from.

/// Mouse button, reduced to the two the editor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Draw/select/drag
    Primary,
    /// Pan
    Secondary,
}

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS
    pub command: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        command: false,
        shift: false,
    };
}

/// One input event consumed by the editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorEvent {
    PointerDown {
        pos: egui::Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        pos: egui::Pos2,
    },
    PointerUp {
        pos: egui::Pos2,
        modifiers: Modifiers,
    },
    /// Zoom by a multiplicative factor anchored at `pos`
    Zoom {
        pos: egui::Pos2,
        factor: f32,
    },
    /// Escape: cancel the in-progress gesture, else clear the selection
    Cancel,
    /// Delete/Backspace over the current selection
    DeleteSelection,
    /// Ctrl/Cmd+A
    SelectAll,
    /// Q/E: rotate the selection by a fixed step
    RotateStep {
        clockwise: bool,
    },
}
