// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Script Engine
//!
//! Handle-based API over the analysis pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │      Embedder (CLI, wasm, host language)      │
//! └──────────────┬───────────────────────────────┘
//!                │ handles + flat buffers
//!                ↓
//! ┌──────────────────────────────────────────────┐
//! │   Engine (memory registry, liveness epochs)   │
//! ├──────────────────────────────────────────────┤
//! │  ScriptHandle  CatalogHandle  RegistryHandle │
//! └──────┬──────────────┬──────────────┬─────────┘
//!        ↓              ↓              ↓
//!   grammar →      catalog        semantic::registry
//!   semantic →     context
//! ```
//!
//! Every object lives in one slot of the engine's memory registry.
//! Handles release their slot on [`ScriptHandle::destroy`] (or the
//! equivalent on other handles) or when dropped. Calls on a released handle
//! fail with [`EngineError::UseAfterFree`].
//!
//! ## Usage
//!
//! ```rust
//! use sqlscript_engine::Engine;
//!
//! let engine = Engine::new();
//! let catalog = engine.create_catalog();
//!
//! let schema = engine.create_script(&catalog, 1).unwrap();
//! schema.insert_text_at(0, "create table foo (a int);").unwrap();
//! schema.analyze().unwrap();
//! catalog.load_script(&schema, 0).unwrap();
//!
//! let query = engine.create_script(&catalog, 2).unwrap();
//! query.insert_text_at(0, "select * from foo where a < 3").unwrap();
//! let analyzed = query.analyze().unwrap().read().unwrap();
//! assert_eq!(analyzed.column_filters.len(), 1);
//! ```

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod memory;
pub mod registry;
pub mod script;
mod version;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use buffer::FlatBuffer;
pub use catalog::CatalogHandle;
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use memory::{MemoryEntry, MemoryKind, MemoryLiveness, SlotKey};
pub use registry::ScriptRegistryHandle;
pub use script::{ScriptHandle, ScriptStage, ScriptStatistics};
pub use version::get_version_text;
