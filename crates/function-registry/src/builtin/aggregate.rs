// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Aggregate functions

use super::define;
use crate::{DataType, FunctionMetadata, FunctionType::Aggregate};

pub fn functions() -> Vec<FunctionMetadata> {
    vec![
        define("count", DataType::BigInt, Aggregate, "Count the number of rows"),
        define("sum", DataType::Decimal, Aggregate, "Sum of values"),
        define("avg", DataType::Decimal, Aggregate, "Average of values"),
        define("min", DataType::Other("any".into()), Aggregate, "Minimum value"),
        define("max", DataType::Other("any".into()), Aggregate, "Maximum value"),
        define("string_agg", DataType::Text, Aggregate, "Concatenate values with a separator"),
        define("array_agg", DataType::Other("array".into()), Aggregate, "Collect values into an array"),
        define("bool_and", DataType::Boolean, Aggregate, "True if all values are true"),
        define("bool_or", DataType::Boolean, Aggregate, "True if any value is true"),
        define("stddev", DataType::Double, Aggregate, "Sample standard deviation"),
        define("variance", DataType::Double, Aggregate, "Sample variance"),
    ]
}
