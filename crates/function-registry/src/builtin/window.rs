// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Window functions

use super::define;
use crate::{DataType, FunctionMetadata, FunctionType::Window};

pub fn functions() -> Vec<FunctionMetadata> {
    vec![
        define("row_number", DataType::BigInt, Window, "Number of the current row"),
        define("rank", DataType::BigInt, Window, "Rank with gaps"),
        define("dense_rank", DataType::BigInt, Window, "Rank without gaps"),
        define("ntile", DataType::Integer, Window, "Bucket number"),
        define("lag", DataType::Other("any".into()), Window, "Value of a preceding row"),
        define("lead", DataType::Other("any".into()), Window, "Value of a following row"),
        define("first_value", DataType::Other("any".into()), Window, "First value of the frame"),
        define("last_value", DataType::Other("any".into()), Window, "Last value of the frame"),
    ]
}
