// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

pub mod clipboard;
pub mod events;
pub mod interaction;
