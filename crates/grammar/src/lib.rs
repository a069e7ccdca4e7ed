// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! SQL Script Grammar
//!
//! The front half of the analysis pipeline:
//!
//! - [`TextBuffer`]: rope-backed script text with versioned edits
//! - [`scan`]: text to tokens plus a [`NameRegistry`] of interned names
//! - [`parse`]: tokens to a flat syntax tree, one subtree per statement
//!
//! Both stages are infallible. Malformed SQL is reported through
//! [`Diagnostic`](sqlscript_ir::Diagnostic)s on their outputs.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlscript_grammar::{parse, scan};
//!
//! let scanned = Arc::new(scan("select a from foo", 0));
//! let parsed = parse(scanned);
//! assert_eq!(parsed.statements.len(), 1);
//! assert!(parsed.diagnostics.is_empty());
//! ```

pub mod ast;
pub mod error;
pub mod keywords;
pub mod parser;
pub mod scanner;
pub mod text;

pub use ast::{ConstraintKind, Node, ParsedScript, Statement, StatementType};
pub use error::{TextError, TextResult};
pub use keywords::{KeywordCategory, all_keywords, keyword_category};
pub use parser::{MAX_NESTING_DEPTH, parse};
pub use scanner::{
    NameEntry, NameRegistry, RelativePosition, ScannedScript, SymbolLocation, Token,
    normalize_name, scan,
};
pub use text::TextBuffer;
