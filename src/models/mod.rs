// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: annotations, the per-image store, and undo history.

pub mod annotation;
pub mod history;
pub mod store;
