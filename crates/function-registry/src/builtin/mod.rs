// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Builtin SQL function definitions
//!
//! Names are lowercase, matching the normalized names of the scanner.

use crate::{DataType, FunctionMetadata, FunctionType};

pub mod aggregate;
pub mod scalar;
pub mod window;

/// All builtin functions
pub fn all_functions() -> Vec<FunctionMetadata> {
    let mut functions = aggregate::functions();
    functions.extend(scalar::functions());
    functions.extend(window::functions());
    functions
}

fn define(
    name: &str,
    return_type: DataType,
    function_type: FunctionType,
    description: &str,
) -> FunctionMetadata {
    FunctionMetadata::new(name, return_type)
        .with_type(function_type)
        .with_description(description)
}
