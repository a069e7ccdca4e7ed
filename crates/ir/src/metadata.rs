// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for columns and functions
//!
//! This module defines the types used to describe column types declared in
//! `CREATE TABLE` statements and the builtin functions scripts may call.

use serde::{Deserialize, Serialize};

/// SQL data types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DataType {
    // Numeric types
    Integer,
    BigInt,
    SmallInt,
    Decimal,
    Float,
    Double,

    // String types
    Varchar(Option<usize>),
    Char(Option<usize>),
    Text,

    // Binary types
    Blob,

    // Date/Time types
    Date,
    Time,
    Timestamp,
    Interval,

    // Boolean
    Boolean,

    // JSON
    Json,

    // Special types
    Uuid,

    // Unknown/Other (with original type name)
    Other(String),
}

impl DataType {
    /// Map a SQL type name such as `varchar(25)` to a data type
    ///
    /// Unknown names are kept verbatim in [`DataType::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlscript_ir::DataType;
    ///
    /// assert_eq!(DataType::from_sql_name("INT"), DataType::Integer);
    /// assert_eq!(DataType::from_sql_name("varchar(25)"), DataType::Varchar(Some(25)));
    /// ```
    pub fn from_sql_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let (base, args) = match lower.find('(') {
            Some(paren) => (lower[..paren].trim(), Some(&lower[paren + 1..])),
            None => (lower.as_str(), None),
        };
        let length = args
            .and_then(|a| a.trim_end_matches(')').split(',').next())
            .and_then(|a| a.trim().parse::<usize>().ok());

        match base {
            "int" | "integer" | "int4" => DataType::Integer,
            "bigint" | "int8" => DataType::BigInt,
            "smallint" | "int2" => DataType::SmallInt,
            "decimal" | "numeric" => DataType::Decimal,
            "real" | "float" | "float4" => DataType::Float,
            "double" | "double precision" | "float8" => DataType::Double,
            "varchar" | "character varying" => DataType::Varchar(length),
            "char" | "character" => DataType::Char(length),
            "text" | "string" => DataType::Text,
            "blob" | "bytea" => DataType::Blob,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "timestamp" | "datetime" => DataType::Timestamp,
            "interval" => DataType::Interval,
            "bool" | "boolean" => DataType::Boolean,
            "json" | "jsonb" => DataType::Json,
            "uuid" => DataType::Uuid,
            _ => DataType::Other(name.trim().to_string()),
        }
    }
}

/// Function parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Parameter name
    pub name: String,
    /// Parameter data type
    pub data_type: DataType,
    /// Whether the parameter has a default value
    pub has_default: bool,
    /// Whether this is a variadic parameter
    pub is_variadic: bool,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            has_default: false,
            is_variadic: false,
        }
    }

    /// Builder method: mark as variadic
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }
}

/// Function classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    Scalar,
    Aggregate,
    Window,
    Table,
}

/// Metadata for a database function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Function name
    pub name: String,
    /// Return type
    pub return_type: DataType,
    /// Function parameters
    pub parameters: Vec<FunctionParameter>,
    /// Function type (scalar, aggregate, window)
    pub function_type: FunctionType,
    /// Function description/documentation
    pub description: Option<String>,
    /// Whether this is a built-in function
    pub is_builtin: bool,
}

impl FunctionMetadata {
    /// Create new function metadata with builder pattern
    pub fn new(name: impl Into<String>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            function_type: FunctionType::Scalar,
            description: None,
            is_builtin: true,
        }
    }

    /// Builder method: add parameters
    pub fn with_parameters(mut self, params: Vec<FunctionParameter>) -> Self {
        self.parameters = params;
        self
    }

    /// Builder method: set function type
    pub fn with_type(mut self, function_type: FunctionType) -> Self {
        self.function_type = function_type;
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Get function signature (for display in completion)
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.is_variadic {
                    format!("{} {:?}...", p.name, p.data_type)
                } else {
                    format!("{} {:?}", p.name, p.data_type)
                }
            })
            .collect();
        format!(
            "{}({}) -> {:?}",
            self.name,
            params.join(", "),
            self.return_type
        )
    }
}
