// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # WebAssembly bindings
//!
//! JavaScript-facing wrappers around the engine handles. Results cross the
//! boundary as JSON strings.

mod exports;

pub use exports::*;
