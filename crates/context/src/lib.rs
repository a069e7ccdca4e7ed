// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Script Context
//!
//! Cursor placement and completion on top of the scanned, parsed and
//! analyzed outputs of a script.
//!
//! ## Overview
//!
//! A [`ScriptCursor`] maps a byte offset to the token, statement and
//! innermost syntax node it belongs to, and derives a [`CursorContext`]
//! from the enclosing table or column reference. [`complete_at_cursor`]
//! turns that context into ranked candidates drawn from keywords, the
//! script's own names, the catalog, the function registry and the
//! cross-script column registry.
//!
//! ## Examples
//!
//! ```rust
//! use sqlscript_catalog::Catalog;
//! use sqlscript_context::{CompletionSources, ScriptCursor, complete_at_cursor};
//! use sqlscript_function_registry::FunctionRegistry;
//! use sqlscript_grammar::{parse, scan};
//! use sqlscript_semantic::Analyzer;
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new();
//! let functions = FunctionRegistry::new();
//! let parsed = Arc::new(parse(Arc::new(scan("sel", 0))));
//! let analyzed = Analyzer::analyze(parsed.clone(), &catalog, 1, &functions);
//!
//! let cursor = ScriptCursor::place(&parsed.scanned, Some(&parsed), Some(&analyzed), 3);
//! let sources = CompletionSources {
//!     analyzed: Some(&analyzed),
//!     catalog: &catalog,
//!     registry: None,
//!     functions: &functions,
//! };
//! let completion = complete_at_cursor(&cursor, &sources, 10);
//! assert_eq!(completion.candidates[0].completion_text, "select");
//! ```

pub mod completion;
pub mod cursor;
pub mod keywords;
pub mod matching;

pub use completion::{
    CandidateKind, CandidateObject, CandidateObjectKind, Completion, CompletionCandidate,
    CompletionSelection, CompletionSources, CompletionStrategy, complete_at_cursor, quote_name,
};
pub use cursor::{CursorContext, ScriptCursor};
pub use keywords::{KeywordProvider, KeywordSet, SqlKeyword};
pub use matching::{MatchTier, match_tier};
