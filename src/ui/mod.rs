// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

pub mod browser;
pub mod canvas;
pub mod toolbar;
