// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Function Registry
//!
//! This crate provides the builtin function namespace. The analyzer falls
//! back to it for function calls that are not schema-qualified, and the
//! completion engine offers its functions as candidates.
//!
//! ## Usage
//!
//! ```rust
//! use sqlscript_function_registry::{FunctionRegistry, FunctionType};
//!
//! let registry = FunctionRegistry::new();
//! let count = registry.get_function("COUNT").unwrap();
//! assert_eq!(count.function_type, FunctionType::Aggregate);
//! ```

pub mod builtin;
pub mod registry;

// Re-exports from ir for convenience
pub use sqlscript_ir::{DataType, FunctionMetadata, FunctionParameter, FunctionType};

pub use registry::FunctionRegistry;
