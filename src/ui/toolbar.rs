// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar: tool selection, active class, stroke width, and edit actions.

use crate::editor::interaction::{Editor, Tool};
use crate::ui::canvas;

/// Toolbar requests that need collaborators the toolbar doesn't hold.
pub enum ToolbarAction {
    None,
    Save,
}

/// Display the toolbar row. Returns an action for the app to carry out.
pub fn show(
    ui: &mut egui::Ui,
    editor: &mut Editor,
    class_names: &[String],
    line_width: &mut f32,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Tools:");
        ui.separator();

        if ui
            .selectable_label(editor.tool == Tool::Select, "⬆ Select")
            .clicked()
        {
            editor.tool = Tool::Select;
        }
        if ui
            .selectable_label(editor.tool == Tool::DrawBox, "▭ Box")
            .clicked()
        {
            editor.tool = Tool::DrawBox;
        }
        if ui
            .selectable_label(editor.tool == Tool::DrawQuad, "▱ Quad")
            .clicked()
        {
            editor.tool = Tool::DrawQuad;
        }

        ui.separator();

        ui.label("Class:");
        let active = editor.store.active_class;
        let active_label = class_names
            .get(active as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", active));
        egui::ComboBox::from_id_source("active_class")
            .selected_text(active_label)
            .show_ui(ui, |ui| {
                let count = class_names.len().max(active as usize + 1);
                for id in 0..count as u32 {
                    let name = class_names
                        .get(id as usize)
                        .cloned()
                        .unwrap_or_else(|| format!("class_{}", id));
                    if ui
                        .selectable_label(editor.store.active_class == id, name)
                        .clicked()
                    {
                        editor.store.active_class = id;
                        // Reassigns the selection too, when there is one
                        editor.assign_class(id);
                    }
                }
            });

        ui.separator();

        ui.label("Width:");
        ui.add(egui::Slider::new(line_width, 0.5..=6.0).fixed_decimals(1));

        ui.separator();

        if ui
            .add_enabled(editor.history.can_undo(), egui::Button::new("↶ Undo"))
            .clicked()
        {
            editor.undo();
        }
        if ui
            .add_enabled(editor.history.can_redo(), egui::Button::new("↷ Redo"))
            .clicked()
        {
            editor.redo();
        }

        ui.separator();

        if ui
            .add_enabled(editor.store.is_dirty(), egui::Button::new("💾 Save"))
            .clicked()
        {
            action = ToolbarAction::Save;
        }

        ui.separator();
        ui.label(
            egui::RichText::new(canvas::tool_hint(editor.tool))
                .italics()
                .weak(),
        );
    });

    action
}
