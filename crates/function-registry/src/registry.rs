// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use crate::{FunctionMetadata, builtin};
use std::collections::HashMap;
use tracing::debug;

/// Lookup key, `("", name)` for unqualified functions
type FunctionKey = (String, String);

fn key(schema: &str, name: &str) -> FunctionKey {
    (schema.to_ascii_lowercase(), name.to_ascii_lowercase())
}

/// Function registry for SQL functions
///
/// Builtins live in the unqualified namespace. Additional functions can be
/// registered under a schema.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: Vec<FunctionMetadata>,
    by_key: HashMap<FunctionKey, usize>,
}

impl FunctionRegistry {
    /// Create a new function registry with all builtin functions loaded
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sqlscript_function_registry::FunctionRegistry;
    ///
    /// let registry = FunctionRegistry::new();
    /// assert!(registry.has_function("coalesce"));
    /// ```
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for function in builtin::all_functions() {
            registry.register("", function);
        }
        debug!(count = registry.functions.len(), "Loaded builtin functions");
        registry
    }

    /// Create a registry without any functions
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Register a function, replacing one with the same qualified name
    pub fn register(&mut self, schema: &str, function: FunctionMetadata) {
        let key = key(schema, &function.name);
        match self.by_key.get(&key) {
            Some(index) => self.functions[*index] = function,
            None => {
                self.by_key.insert(key, self.functions.len());
                self.functions.push(function);
            }
        }
    }

    /// All functions in registration order
    pub fn functions(&self) -> &[FunctionMetadata] {
        &self.functions
    }

    /// Lookup an unqualified function (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use sqlscript_function_registry::FunctionRegistry;
    /// let registry = FunctionRegistry::new();
    /// assert_eq!(registry.get_function("Count").unwrap().name, "count");
    /// ```
    pub fn get_function(&self, name: &str) -> Option<&FunctionMetadata> {
        self.get_qualified_function("", name)
    }

    /// Lookup a function registered under a schema
    pub fn get_qualified_function(&self, schema: &str, name: &str) -> Option<&FunctionMetadata> {
        self.by_key
            .get(&key(schema, name))
            .map(|index| &self.functions[*index])
    }

    /// Resolve a call: the qualified name first, then the builtin namespace
    pub fn resolve(&self, schema: Option<&str>, name: &str) -> Option<&FunctionMetadata> {
        schema
            .and_then(|schema| self.get_qualified_function(schema, name))
            .or_else(|| self.get_function(name))
    }

    /// Check if an unqualified function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.get_function(name).is_some()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataType, FunctionType};

    #[test]
    fn test_new_registry() {
        let registry = FunctionRegistry::new();
        assert!(!registry.functions().is_empty());
        assert!(
            registry
                .functions()
                .iter()
                .any(|f| f.function_type == FunctionType::Window)
        );
    }

    #[test]
    fn test_get_function_case_insensitive() {
        let registry = FunctionRegistry::new();

        let upper = registry.get_function("COUNT");
        let lower = registry.get_function("count");
        let mixed = registry.get_function("Count");

        assert!(upper.is_some());
        assert_eq!(upper, lower);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_has_function() {
        let registry = FunctionRegistry::new();

        assert!(registry.has_function("sum"));
        assert!(!registry.has_function("NONEXISTENT"));
    }

    #[test]
    fn test_qualified_lookup_falls_back_to_builtins() {
        let mut registry = FunctionRegistry::new();
        registry.register("ext", FunctionMetadata::new("sum", DataType::Text));

        assert_eq!(registry.resolve(Some("ext"), "SUM").unwrap().return_type, DataType::Text);
        assert_eq!(registry.resolve(None, "sum").unwrap().return_type, DataType::Decimal);
        assert_eq!(
            registry.resolve(Some("missing"), "sum").unwrap().return_type,
            DataType::Decimal
        );
        assert!(registry.resolve(Some("ext"), "nope").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = FunctionRegistry::empty();
        registry.register("", FunctionMetadata::new("f", DataType::Integer));
        registry.register("", FunctionMetadata::new("F", DataType::Text));
        assert_eq!(registry.functions().len(), 1);
        assert_eq!(registry.get_function("f").unwrap().return_type, DataType::Text);
    }
}
