// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! Coordinates the editor, the dataset session, background image decoding,
//! debounced label saving, and the panel layout. All label writes funnel
//! through `save_current` so the implicit-save rules stay in one place.

use crate::editor::events::EditorEvent;
use crate::editor::interaction::Editor;
use crate::io::label_format;
use crate::io::media::{DecodedImage, ImageLoader};
use crate::io::storage::{FsDataset, FsKeyValue, KeyValueStore, LabelStore};
use crate::models::annotation::{Annotation, LabelKind};
use crate::session::{SaveDebouncer, ScrubGuard, Session};
use crate::ui::{browser, canvas, toolbar};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

const LINE_WIDTH_KEY: &str = "line_width";
const DEFAULT_LINE_WIDTH: f32 = 2.0;
const THUMBNAIL_SIZE: u32 = 128;
/// New thumbnail decodes kicked off per frame.
const THUMBNAIL_BATCH: usize = 4;

/// Main application state.
pub struct BoxlabApp {
    editor: Editor,
    session: Option<Session>,
    dataset: FsDataset,
    prefs: FsKeyValue,

    /// Full-size decoder and the small one for browser thumbnails
    image_loader: ImageLoader,
    thumb_loader: ImageLoader,
    /// Decoded full-size images for the current image and its neighbors
    decoded: HashMap<PathBuf, DecodedImage>,
    /// Parsed labels for preload-window neighbors, so scrubbing back and
    /// forth never rereads a label file
    labels: HashMap<PathBuf, (Vec<Annotation>, LabelKind)>,
    thumbnails: HashMap<PathBuf, egui::TextureHandle>,

    current_texture: Option<egui::TextureHandle>,
    current_size: Option<(u32, u32)>,
    load_error: Option<String>,
    /// Current image still needs a decode request (held back while scrubbing)
    decode_pending: bool,
    /// Current image still needs its label file read (held back the same way)
    labels_pending: bool,

    debouncer: SaveDebouncer,
    cursor_debouncer: SaveDebouncer,
    scrub: ScrubGuard,
    last_revision: u64,

    search_query: String,
    line_width: f32,
}

impl BoxlabApp {
    pub fn new(folder: Option<PathBuf>) -> Self {
        Self::with_prefs(FsKeyValue::open_default(), folder)
    }

    fn with_prefs(prefs: FsKeyValue, folder: Option<PathBuf>) -> Self {
        let line_width = prefs
            .get(LINE_WIDTH_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LINE_WIDTH);

        let mut app = Self {
            editor: Editor::new(),
            session: None,
            dataset: FsDataset,
            prefs,
            image_loader: ImageLoader::new(None),
            thumb_loader: ImageLoader::new(Some(THUMBNAIL_SIZE)),
            decoded: HashMap::new(),
            labels: HashMap::new(),
            thumbnails: HashMap::new(),
            current_texture: None,
            current_size: None,
            load_error: None,
            decode_pending: false,
            labels_pending: false,
            debouncer: SaveDebouncer::default(),
            cursor_debouncer: SaveDebouncer::default(),
            scrub: ScrubGuard::default(),
            last_revision: 0,
            search_query: String::new(),
            line_width,
        };
        if let Some(folder) = folder {
            app.open_folder(folder);
        }
        app
    }

    fn open_folder(&mut self, folder: PathBuf) {
        self.save_current();
        self.flush_cursor();
        match Session::open(&self.dataset, folder) {
            Ok(mut session) => {
                session.restore_cursor(&self.prefs);
                self.session = Some(session);
                self.decoded.clear();
                self.labels.clear();
                self.thumbnails.clear();
                self.activate_current();
            }
            Err(e) => {
                log::error!("Failed to open folder: {}", e);
                self.editor.status = Some(format!("Failed to open folder: {}", e));
            }
        }
    }

    /// Load labels for the image under the cursor and schedule its decode.
    ///
    /// While the user is still scrubbing, only cached labels are shown; the
    /// disk read waits for the guard alongside the decode.
    fn activate_current(&mut self) {
        self.current_texture = None;
        self.current_size = None;
        self.load_error = None;
        self.decode_pending = false;
        self.labels_pending = false;
        self.editor.status = None;

        let Some(path) = self.session.as_ref().and_then(|s| s.current_path()) else {
            self.editor.load(Vec::new(), Default::default());
            return;
        };
        let path = path.to_path_buf();

        if let Some((annotations, kind)) = self.labels.remove(&path) {
            self.editor.load(annotations, kind);
        } else if self.scrub.settled(Instant::now()) {
            self.load_labels_from_disk(&path);
        } else {
            self.editor.load(Vec::new(), Default::default());
            self.labels_pending = true;
        }
        self.last_revision = self.editor.history.revision();
        self.decode_pending = true;
    }

    fn load_labels_from_disk(&mut self, path: &Path) {
        match self.dataset.load_label_text(path) {
            Ok(text) => {
                let (annotations, kind) = label_format::parse_labels(&text);
                self.editor.load(annotations, kind);
            }
            Err(e) => {
                log::error!("Failed to read labels for {}: {}", path.display(), e);
                self.editor.load(Vec::new(), Default::default());
                self.editor.status = Some(format!("Failed to read labels: {}", e));
            }
        }
        self.last_revision = self.editor.history.revision();
    }

    /// Write the current labels out, bypassing the debounce. No-op when clean.
    fn save_current(&mut self) {
        self.debouncer.cancel();
        if !self.editor.store.is_dirty() {
            return;
        }
        let Some(path) = self.session.as_ref().and_then(|s| s.current_path()) else {
            return;
        };
        let path = path.to_path_buf();
        let text = label_format::serialize_labels(&self.editor.store.annotations);
        match self.dataset.save_label_text(&path, &text) {
            Ok(()) => {
                self.editor.store.mark_clean();
                self.labels.remove(&path);
                log::info!("Saved {} labels for {}",
                    self.editor.store.annotations.len(), path.display());
            }
            Err(e) => {
                log::error!("Failed to save labels: {}", e);
                self.editor.status = Some(format!("Failed to save labels: {}", e));
            }
        }
    }

    /// Move the cursor and switch images; edits are saved first.
    fn navigate(&mut self, delta: isize) {
        self.save_current();
        let moved = self
            .session
            .as_mut()
            .and_then(|s| s.advance(delta).map(|p| p.to_path_buf()));
        if moved.is_some() {
            self.scrub.mark(Instant::now());
            self.after_cursor_move();
        }
    }

    fn goto_path(&mut self, path: PathBuf) {
        self.save_current();
        let jumped = self
            .session
            .as_mut()
            .map(|s| s.select_path(&path))
            .unwrap_or(false);
        if jumped {
            self.after_cursor_move();
        }
    }

    fn after_cursor_move(&mut self) {
        // The cursor write is debounced: a held navigation key would
        // otherwise flush the preference file on every repeat.
        self.cursor_debouncer.touch(Instant::now());
        self.activate_current();
        self.evict_stale();
    }

    /// Persist the cursor immediately, bypassing the debounce.
    fn flush_cursor(&mut self) {
        self.cursor_debouncer.cancel();
        if let Some(session) = &self.session {
            session.store_cursor(&mut self.prefs);
        }
    }

    /// Paths whose cached data is still wanted: the current image plus its
    /// preload window.
    fn cache_window(&self) -> Vec<PathBuf> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let mut keep = session.preload_paths();
        if let Some(current) = session.current_path() {
            keep.push(current.to_path_buf());
        }
        keep
    }

    /// Drop cached neighbors that fell out of the preload window.
    fn evict_stale(&mut self) {
        let keep = self.cache_window();
        self.decoded.retain(|path, _| keep.iter().any(|k| k == path));
        self.labels.retain(|path, _| keep.iter().any(|k| k == path));
    }

    /// Collect finished background decodes into textures and caches.
    fn pump_loaders(&mut self, ctx: &egui::Context) {
        let current = self
            .session
            .as_ref()
            .and_then(|s| s.current_path().map(|p| p.to_path_buf()));
        let window = self.cache_window();

        for result in self.image_loader.poll() {
            match result.result {
                Ok(image) => {
                    // The cursor may have moved on since the request
                    if window.iter().any(|k| k == &result.path) {
                        self.decoded.insert(result.path, image);
                    } else {
                        log::debug!(
                            "Dropping stale decode for {}",
                            result.path.display()
                        );
                    }
                }
                Err(e) => {
                    if current.as_deref() == Some(result.path.as_path()) {
                        self.load_error = Some(e);
                    } else {
                        log::warn!("Failed to preload {}: {}", result.path.display(), e);
                    }
                }
            }
        }

        for result in self.thumb_loader.poll() {
            match result.result {
                Ok(image) => {
                    let texture = ctx.load_texture(
                        format!("thumb:{}", result.path.display()),
                        color_image(&image),
                        egui::TextureOptions::LINEAR,
                    );
                    self.thumbnails.insert(result.path, texture);
                }
                Err(e) => log::debug!("No thumbnail for {}: {}", result.path.display(), e),
            }
        }
    }

    /// Upload the current image to the GPU once its decode has landed.
    fn ensure_current_texture(&mut self, ctx: &egui::Context) {
        if self.current_texture.is_some() {
            return;
        }
        let Some(path) = self
            .session
            .as_ref()
            .and_then(|s| s.current_path().map(|p| p.to_path_buf()))
        else {
            return;
        };
        if let Some(image) = self.decoded.get(&path) {
            self.current_size = Some((image.width, image.height));
            self.current_texture = Some(ctx.load_texture(
                "current_image",
                color_image(image),
                egui::TextureOptions::LINEAR,
            ));
            self.decode_pending = false;
        }
    }

    /// Once scrubbing has settled, perform the deferred label read, kick off
    /// the current decode, and warm both caches for the preload window.
    fn settle_pending(&mut self, now: Instant) {
        if !(self.decode_pending || self.labels_pending) || !self.scrub.settled(now) {
            return;
        }
        let Some(path) = self
            .session
            .as_ref()
            .and_then(|s| s.current_path().map(|p| p.to_path_buf()))
        else {
            self.decode_pending = false;
            self.labels_pending = false;
            return;
        };

        if self.labels_pending {
            self.labels_pending = false;
            self.load_labels_from_disk(&path);
        }
        if self.decode_pending {
            self.decode_pending = false;
            if !self.decoded.contains_key(&path) {
                self.image_loader.request(path);
            }
            if let Some(session) = &self.session {
                self.image_loader.request_batch(session.preload_paths());
            }
        }
        self.warm_label_cache();
    }

    /// Read and parse label files for the preload window.
    fn warm_label_cache(&mut self) {
        let Some(session) = &self.session else { return };
        for path in session.preload_paths() {
            if self.labels.contains_key(&path) {
                continue;
            }
            match self.dataset.load_label_text(&path) {
                Ok(text) => {
                    self.labels.insert(path, label_format::parse_labels(&text));
                }
                Err(e) => log::debug!("Skipping label preload for {}: {}", path.display(), e),
            }
        }
    }

    /// Request a few missing thumbnails for the visible list each frame.
    fn request_thumbnails(&mut self) {
        let Some(session) = &self.session else { return };
        let missing: Vec<PathBuf> = session
            .visible_paths()
            .filter(|p| !self.thumbnails.contains_key(*p) && !self.thumb_loader.is_in_flight(p))
            .take(THUMBNAIL_BATCH)
            .map(|p| p.to_path_buf())
            .collect();
        for path in missing {
            self.thumb_loader.request(path);
        }
    }

    /// Debounced autosave: any history activity restarts the quiet period.
    /// Pending cursor writes flush here as well.
    fn tick_saves(&mut self, now: Instant) {
        let revision = self.editor.history.revision();
        if revision != self.last_revision {
            self.last_revision = revision;
            if self.editor.store.is_dirty() {
                self.debouncer.touch(now);
            }
        }
        if self.debouncer.take_due(now) {
            self.save_current();
        }
        if self.cursor_debouncer.take_due(now) {
            if let Some(session) = &self.session {
                session.store_cursor(&mut self.prefs);
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        let mut nav: isize = 0;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::D) {
                nav += 1;
            }
            if i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::A) {
                nav -= 1;
            }
        });
        // Plain A is navigation, Ctrl+A is select-all
        let select_all = ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::A));
        if select_all {
            nav = 0;
            self.editor.handle_event(EditorEvent::SelectAll);
        }
        if nav != 0 && !ctx.input(|i| i.modifiers.command) {
            self.navigate(nav);
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.editor.handle_event(EditorEvent::Cancel);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.editor.handle_event(EditorEvent::DeleteSelection);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Q) && !i.modifiers.command) {
            self.editor.handle_event(EditorEvent::RotateStep { clockwise: false });
        }
        if ctx.input(|i| i.key_pressed(egui::Key::E) && !i.modifiers.command) {
            self.editor.handle_event(EditorEvent::RotateStep { clockwise: true });
        }

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.editor.undo();
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.editor.redo();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::C)) {
            self.editor.copy_selection(&mut self.prefs);
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::V)) {
            self.editor.paste_clipboard(&self.prefs);
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S)) {
            self.save_current();
            self.editor.status = Some("Saved".to_string());
        }
    }

    fn handle_browser_action(&mut self, action: browser::BrowserAction) {
        match action {
            browser::BrowserAction::Open(path) => self.goto_path(path),
            browser::BrowserAction::FilterChanged => {
                // A new filter invalidates the preview search results
                self.search_query.clear();
                self.save_current();
                let before = self
                    .session
                    .as_ref()
                    .and_then(|s| s.current_path().map(|p| p.to_path_buf()));
                if let Some(session) = &mut self.session {
                    if let Err(e) = session.rebuild_view(&self.dataset) {
                        log::error!("Failed to apply filter: {}", e);
                    }
                }
                let after = self
                    .session
                    .as_ref()
                    .and_then(|s| s.current_path().map(|p| p.to_path_buf()));
                if before != after {
                    self.after_cursor_move();
                }
            }
            browser::BrowserAction::None => {}
        }
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Folder...").clicked() {
                        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                            self.open_folder(folder);
                        }
                        ui.close_menu();
                    }
                    let dirty = self.editor.store.is_dirty();
                    if ui.add_enabled(dirty, egui::Button::new("Save (Ctrl+S)")).clicked() {
                        self.save_current();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    if ui
                        .add_enabled(self.editor.history.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                        .clicked()
                    {
                        self.editor.undo();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(
                            self.editor.history.can_redo(),
                            egui::Button::new("Redo (Ctrl+Shift+Z)"),
                        )
                        .clicked()
                    {
                        self.editor.redo();
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_selection = self.editor.store.has_selection();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Delete Selected"))
                        .clicked()
                    {
                        self.editor.handle_event(EditorEvent::DeleteSelection);
                        ui.close_menu();
                    }
                    if ui.button("Select All (Ctrl+A)").clicked() {
                        self.editor.handle_event(EditorEvent::SelectAll);
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Reset Zoom").clicked() {
                        self.editor.viewport.reset_view();
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_status_line(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_line").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.session {
                    Some(session) => {
                        let name = session
                            .current_path()
                            .and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "-".to_string());
                        ui.label(name);
                        if let Some(pos) = session.position() {
                            ui.separator();
                            ui.label(format!("{} / {}", pos, session.len()));
                        }
                        ui.separator();
                        ui.label(format!("{} annotations", self.editor.store.annotations.len()));
                        let selected = self.editor.store.multi().len();
                        if selected > 0 {
                            ui.separator();
                            ui.label(format!("{} selected", selected));
                        }
                        if self.editor.store.is_dirty() {
                            ui.separator();
                            ui.label(egui::RichText::new("● unsaved").color(egui::Color32::GOLD));
                        }
                        ui.separator();
                        ui.label(format!("{:.0}%", self.editor.viewport.view_scale() * 100.0));
                    }
                    None => {
                        ui.label("No folder loaded");
                    }
                }
                if let Some(status) = &self.editor.status {
                    ui.separator();
                    ui.label(egui::RichText::new(status).weak());
                }
            });
        });
    }

    fn show_welcome(ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(20.0);
                ui.heading(
                    egui::RichText::new("BOXLAB")
                        .size(32.0)
                        .color(egui::Color32::from_gray(200)),
                );
                ui.label(
                    egui::RichText::new("Bounding box and oriented box annotation")
                        .size(14.0)
                        .color(egui::Color32::from_gray(150)),
                );
                ui.add_space(20.0);
                ui.label(
                    egui::RichText::new("Open an image folder to begin annotating")
                        .color(egui::Color32::from_gray(180)),
                );
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new("File → Open Folder...")
                        .weak()
                        .color(egui::Color32::from_gray(130)),
                );
            });
        });
    }
}

impl eframe::App for BoxlabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_loaders(ctx);
        self.settle_pending(Instant::now());
        self.ensure_current_texture(ctx);
        self.request_thumbnails();
        self.handle_keys(ctx);

        // Flush edits and the cursor before the window goes away
        if ctx.input(|i| i.viewport().close_requested()) {
            self.save_current();
            self.flush_cursor();
        }

        self.show_menu(ctx);

        let line_width_before = self.line_width;
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let class_names = self
                .session
                .as_ref()
                .map(|s| s.class_names.clone())
                .unwrap_or_default();
            match toolbar::show(ui, &mut self.editor, &class_names, &mut self.line_width) {
                toolbar::ToolbarAction::Save => {
                    self.save_current();
                    self.editor.status = Some("Saved".to_string());
                }
                toolbar::ToolbarAction::None => {}
            }
        });
        if (self.line_width - line_width_before).abs() > f32::EPSILON {
            self.prefs.set(LINE_WIDTH_KEY, &self.line_width.to_string());
        }

        if let Some(mut session) = self.session.take() {
            let action = egui::SidePanel::left("browser")
                .default_width(220.0)
                .show(ctx, |ui| {
                    browser::show(ui, &mut session, &self.thumbnails, &mut self.search_query)
                })
                .inner;
            self.session = Some(session);
            self.handle_browser_action(action);
        }

        self.show_status_line(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_none() {
                Self::show_welcome(ui);
                return;
            }
            let class_names = self
                .session
                .as_ref()
                .map(|s| s.class_names.clone())
                .unwrap_or_default();
            canvas::show(
                ui,
                &mut self.editor,
                self.current_texture.as_ref(),
                self.current_size,
                &class_names,
                self.line_width,
                self.load_error.as_deref(),
            );
        });

        self.tick_saves(Instant::now());

        // Keep polling while decodes or pending writes are outstanding
        let has_images = self.session.as_ref().map(|s| !s.is_empty()).unwrap_or(false);
        let waiting = self.decode_pending
            || self.labels_pending
            || self.debouncer.is_pending()
            || self.cursor_debouncer.is_pending()
            || (has_images && self.current_texture.is_none());
        if waiting {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }
}

fn color_image(image: &DecodedImage) -> egui::ColorImage {
    egui::ColorImage::from_rgba_unmultiplied(
        [image.width as usize, image.height as usize],
        &image.pixels,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SAVE_DEBOUNCE, SCRUB_GUARD};
    use std::fs;
    use std::time::Duration;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("boxlab_app_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A dataset folder of empty image files with the given label text.
    fn dataset(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = temp_dir(name);
        for (image, labels) in files {
            fs::write(dir.join(image), b"").unwrap();
            fs::write(dir.join(Path::new(image).with_extension("txt")), labels).unwrap();
        }
        dir
    }

    fn test_app(name: &str, root: &Path) -> BoxlabApp {
        let prefs = FsKeyValue::open(temp_dir(&format!("{}_prefs", name)).join("prefs.json"));
        BoxlabApp::with_prefs(prefs, Some(root.to_path_buf()))
    }

    #[test]
    fn test_filter_change_clears_search_preview() {
        let root = dataset("filter_search", &[("img1.jpg", ""), ("img2.jpg", "")]);
        let mut app = test_app("filter_search", &root);
        app.search_query = "img".to_string();

        app.session.as_mut().unwrap().criteria.name_query = "img2".to_string();
        app.handle_browser_action(browser::BrowserAction::FilterChanged);

        assert!(app.search_query.is_empty());
        assert_eq!(app.session.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_scrubbing_defers_label_reads() {
        let root = dataset(
            "scrub_defers",
            &[("img1.jpg", "0 0.5 0.5 0.1 0.1"), ("img2.jpg", "1 0.5 0.5 0.2 0.2")],
        );
        let mut app = test_app("scrub_defers", &root);
        // Opening a folder is not scrubbing; the first image loads at once
        assert_eq!(app.editor.store.annotations.len(), 1);

        app.navigate(1);
        assert_eq!(app.session.as_ref().unwrap().position(), Some(2));
        // Mid-scrub only the cursor moved; the label read waits for the guard
        assert!(app.editor.store.annotations.is_empty());

        app.settle_pending(Instant::now() + SCRUB_GUARD);
        assert_eq!(app.editor.store.annotations.len(), 1);
        assert_eq!(app.editor.store.annotations[0].class(), 1);
    }

    #[test]
    fn test_preload_cache_serves_labels_without_disk() {
        let root = dataset(
            "label_cache",
            &[("img1.jpg", "0 0.5 0.5 0.1 0.1"), ("img2.jpg", "1 0.5 0.5 0.2 0.2")],
        );
        let mut app = test_app("label_cache", &root);
        app.navigate(1);
        // Settling warms the label cache for the preload window
        app.settle_pending(Instant::now() + SCRUB_GUARD);

        fs::remove_file(root.join("img1.txt")).unwrap();
        app.navigate(-1);
        assert_eq!(app.editor.store.annotations.len(), 1);
        assert_eq!(app.editor.store.annotations[0].class(), 0);
    }

    #[test]
    fn test_cursor_write_is_debounced() {
        let root = dataset("cursor_debounce", &[("img1.jpg", ""), ("img2.jpg", "")]);
        let mut app = test_app("cursor_debounce", &root);
        let key = format!("last_viewed:{}", root.display());

        app.navigate(1);
        assert_eq!(app.prefs.get(&key), None);

        app.tick_saves(Instant::now() + SAVE_DEBOUNCE);
        let stored = app.prefs.get(&key).unwrap();
        assert!(stored.ends_with("img2.jpg"));
    }

    #[test]
    fn test_stale_decode_result_discarded() {
        let dir = temp_dir("stale_decode");
        let png = dir.join("loose.png");
        image::RgbaImage::new(2, 2).save(&png).unwrap();

        let prefs = FsKeyValue::open(dir.join("prefs.json"));
        let mut app = BoxlabApp::with_prefs(prefs, None);
        let ctx = egui::Context::default();

        // No folder is open, so no decode result is worth keeping
        app.image_loader.request(png.clone());
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.image_loader.is_in_flight(&png) && Instant::now() < deadline {
            app.pump_loaders(&ctx);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!app.image_loader.is_in_flight(&png));
        assert!(app.decoded.is_empty());
    }
}
