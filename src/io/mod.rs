// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Input/output: the label line format, storage collaborators, and
//! background image decoding.

pub mod label_format;
pub mod media;
pub mod storage;
