// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Utility modules: pure geometry and viewport mapping.

pub mod geometry;
pub mod viewport;
