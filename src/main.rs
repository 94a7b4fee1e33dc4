// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! BOXLAB - bounding box and oriented box annotation
//!
//! A desktop tool for walking an image folder and editing YOLO-style
//! label files: axis-aligned boxes and oriented (four-point) boxes.

mod app;
mod editor;
mod io;
mod models;
mod session;
mod ui;
mod util;

use anyhow::Result;
use app::BoxlabApp;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Optional dataset folder on the command line
    let folder = std::env::args().nth(1).map(PathBuf::from);

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("BOXLAB - image annotation"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "BOXLAB",
        options,
        Box::new(|_cc| Ok(Box::new(BoxlabApp::new(folder)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
