// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Scalar functions

use super::define;
use crate::{DataType, FunctionMetadata, FunctionType::Scalar};

pub fn functions() -> Vec<FunctionMetadata> {
    vec![
        // Numeric
        define("abs", DataType::Decimal, Scalar, "Absolute value"),
        define("ceil", DataType::Integer, Scalar, "Round up to nearest integer"),
        define("floor", DataType::Integer, Scalar, "Round down to nearest integer"),
        define("round", DataType::Decimal, Scalar, "Round to nearest decimal"),
        define("trunc", DataType::Decimal, Scalar, "Truncate toward zero"),
        define("sqrt", DataType::Double, Scalar, "Square root"),
        define("power", DataType::Double, Scalar, "Raise to a power"),
        define("mod", DataType::Integer, Scalar, "Remainder of division"),
        define("ln", DataType::Double, Scalar, "Natural logarithm"),
        // Strings
        define("concat", DataType::Text, Scalar, "Concatenate strings"),
        define("substring", DataType::Text, Scalar, "Extract substring"),
        define("length", DataType::Integer, Scalar, "String length"),
        define("upper", DataType::Text, Scalar, "Convert to uppercase"),
        define("lower", DataType::Text, Scalar, "Convert to lowercase"),
        define("trim", DataType::Text, Scalar, "Remove leading and trailing characters"),
        define("replace", DataType::Text, Scalar, "Replace occurrences of a substring"),
        define("strpos", DataType::Integer, Scalar, "Position of a substring"),
        define("split_part", DataType::Text, Scalar, "Field of a split string"),
        define("regexp_replace", DataType::Text, Scalar, "Replace regular expression matches"),
        // Conditionals
        define("coalesce", DataType::Other("any".into()), Scalar, "First non-null argument"),
        define("nullif", DataType::Other("any".into()), Scalar, "Null if both arguments are equal"),
        define("greatest", DataType::Other("any".into()), Scalar, "Largest argument"),
        define("least", DataType::Other("any".into()), Scalar, "Smallest argument"),
        // Date and time
        define("now", DataType::Timestamp, Scalar, "Current timestamp"),
        define("current_date", DataType::Date, Scalar, "Current date"),
        define("date_trunc", DataType::Timestamp, Scalar, "Truncate a timestamp to a precision"),
        define("date_part", DataType::Double, Scalar, "Field of a date or timestamp"),
        define("extract", DataType::Double, Scalar, "Field of a date or timestamp"),
        define("to_date", DataType::Date, Scalar, "Parse a date"),
        define("to_timestamp", DataType::Timestamp, Scalar, "Parse a timestamp"),
    ]
}
