// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for the sqlscript workspace
//!
//! This crate provides common testing components including:
//! - SQL fixtures, among them a TPC-H schema script
//! - Schema descriptor builders for descriptor pools
//! - Assertions over analyzed scripts and completions

pub mod assertions;
pub mod descriptors;
pub mod fixtures;

// Re-exports for convenience
pub use assertions::ScriptAssertions;
pub use descriptors::{SchemaDescriptorBuilder, catalog_with_pool};
pub use fixtures::{
    SqlFixtures, analyze_text, cursor_position, remove_cursor_marker, tpch_catalog,
};
