// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Dataset browser panel: filter controls, sort order, name search, and
//! the scrollable image list with thumbnails.

use crate::io::storage::ClassFilter;
use crate::session::{Session, SortOrder};
use std::collections::HashMap;
use std::path::PathBuf;

/// Browser requests handled by the app.
pub enum BrowserAction {
    None,
    /// Navigate to this image
    Open(PathBuf),
    /// The filter or sort changed; the visible list must be rebuilt
    FilterChanged,
}

pub fn show(
    ui: &mut egui::Ui,
    session: &mut Session,
    thumbnails: &HashMap<PathBuf, egui::TextureHandle>,
    search_query: &mut String,
) -> BrowserAction {
    let mut action = BrowserAction::None;

    ui.heading("Dataset");
    if let Some(pos) = session.position() {
        ui.label(format!("{} / {}", pos, session.len()));
    } else {
        ui.label(format!("0 / {}", session.len()));
    }
    ui.separator();

    if filter_controls(ui, session) {
        action = BrowserAction::FilterChanged;
    }
    ui.separator();

    // Name search: a preview list, independent of the filter
    ui.horizontal(|ui| {
        ui.label("🔍");
        ui.text_edit_singleline(search_query);
    });
    if !search_query.is_empty() {
        let hits = session.search(search_query);
        ui.label(
            egui::RichText::new(format!("{} matches", hits.len())).weak(),
        );
        for hit in hits.into_iter().take(20) {
            let name = hit
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if ui.selectable_label(false, name).clicked() {
                action = BrowserAction::Open(hit);
                search_query.clear();
            }
        }
        ui.separator();
    }

    let current = session.current_path().map(PathBuf::from);
    egui::ScrollArea::vertical().show(ui, |ui| {
        let paths: Vec<PathBuf> = session.visible_paths().map(PathBuf::from).collect();
        for path in paths {
            let is_current = current.as_deref() == Some(path.as_path());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            ui.horizontal(|ui| {
                if let Some(texture) = thumbnails.get(&path) {
                    ui.image((texture.id(), egui::vec2(48.0, 32.0)));
                } else {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(48.0, 32.0), egui::Sense::hover());
                    ui.painter()
                        .rect_filled(rect, 2.0, egui::Color32::from_gray(60));
                }
                if ui.selectable_label(is_current, name).clicked() && !is_current {
                    action = BrowserAction::Open(path.clone());
                }
            });
        }
    });

    action
}

/// Filter and sort widgets; true when anything changed.
fn filter_controls(ui: &mut egui::Ui, session: &mut Session) -> bool {
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.label("Name:");
        if ui
            .text_edit_singleline(&mut session.criteria.name_query)
            .changed()
        {
            changed = true;
        }
    });

    ui.horizontal(|ui| {
        ui.label("Labels:");
        if ui
            .add(egui::DragValue::new(&mut session.criteria.min_labels).range(0..=9999))
            .changed()
        {
            changed = true;
        }
        ui.label("to");
        let mut capped = session.criteria.max_labels != usize::MAX;
        if ui.checkbox(&mut capped, "at most").changed() {
            session.criteria.max_labels = if capped { 100 } else { usize::MAX };
            changed = true;
        }
        if capped
            && ui
                .add(egui::DragValue::new(&mut session.criteria.max_labels).range(0..=9999))
                .changed()
        {
            changed = true;
        }
    });

    ui.horizontal(|ui| {
        ui.label("Classes:");
        let mode_label = match &session.criteria.class_mode {
            ClassFilter::Any => "Any",
            ClassFilter::None => "Unlabeled",
            ClassFilter::Only { .. } => "Only...",
        };
        egui::ComboBox::from_id_source("class_filter_mode")
            .selected_text(mode_label)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(session.criteria.class_mode == ClassFilter::Any, "Any")
                    .clicked()
                {
                    session.criteria.class_mode = ClassFilter::Any;
                    changed = true;
                }
                if ui
                    .selectable_label(session.criteria.class_mode == ClassFilter::None, "Unlabeled")
                    .clicked()
                {
                    session.criteria.class_mode = ClassFilter::None;
                    changed = true;
                }
                let is_only = matches!(session.criteria.class_mode, ClassFilter::Only { .. });
                if ui.selectable_label(is_only, "Only...").clicked() && !is_only {
                    session.criteria.class_mode = ClassFilter::Only {
                        classes: Default::default(),
                        match_all: false,
                    };
                    changed = true;
                }
            });
    });

    let class_names = session.class_names.clone();
    if let ClassFilter::Only { classes, match_all } = &mut session.criteria.class_mode {
        ui.indent("class_filter_only", |ui| {
            let count = class_names.len().max(1);
            for id in 0..count as u32 {
                let name = class_names
                    .get(id as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", id));
                let mut on = classes.contains(&id);
                if ui.checkbox(&mut on, name).changed() {
                    if on {
                        classes.insert(id);
                    } else {
                        classes.remove(&id);
                    }
                    changed = true;
                }
            }
            if ui.checkbox(match_all, "Require every checked class").changed() {
                changed = true;
            }
        });
    }

    ui.horizontal(|ui| {
        ui.label("Sort:");
        if ui
            .selectable_label(session.sort == SortOrder::Name, "Name")
            .clicked()
            && session.sort != SortOrder::Name
        {
            session.sort = SortOrder::Name;
            changed = true;
        }
        if ui
            .selectable_label(session.sort == SortOrder::CreatedAt, "Created")
            .clicked()
            && session.sort != SortOrder::CreatedAt
        {
            session.sort = SortOrder::CreatedAt;
            changed = true;
        }
        let arrow = if session.sort_descending { "⬇" } else { "⬆" };
        if ui.button(arrow).clicked() {
            session.sort_descending = !session.sort_descending;
            changed = true;
        }
    });

    changed
}
