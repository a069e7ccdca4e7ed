// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Table declarations
//!
//! The catalog stores tables from descriptor pools and from analyzed
//! scripts in the same shape.

use serde::Serialize;
use sqlscript_ir::{DataType, ExternalObjectId};
use std::fmt;

/// Compare a declared name with a requested one
///
/// Exact matches win, otherwise names match ignoring ASCII case.
pub fn names_match(declared: &str, requested: &str) -> bool {
    declared == requested || declared.eq_ignore_ascii_case(requested)
}

/// A column of a [`TableDeclaration`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDeclaration {
    pub name: String,
    /// `None` when the type is not known, e.g. for `CREATE TABLE AS`
    pub data_type: Option<DataType>,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            nullable: true,
            is_primary_key: false,
        }
    }

    /// Builder method: set data type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Builder method: mark as primary key column
    pub fn with_primary_key(mut self, is_primary_key: bool) -> Self {
        self.is_primary_key = is_primary_key;
        if is_primary_key {
            self.nullable = false;
        }
        self
    }
}

/// A table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDeclaration {
    /// `(owning entry, index within the entry)`
    pub table_id: ExternalObjectId,
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<ColumnDeclaration>,
    pub is_view: bool,
}

impl TableDeclaration {
    pub fn new(table_id: ExternalObjectId, table_name: impl Into<String>) -> Self {
        Self {
            table_id,
            database_name: String::new(),
            schema_name: String::new(),
            table_name: table_name.into(),
            columns: Vec::new(),
            is_view: false,
        }
    }

    /// Builder method: set database and schema
    pub fn with_qualifiers(
        mut self,
        database_name: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        self.database_name = database_name.into();
        self.schema_name = schema_name.into();
        self
    }

    /// Builder method: set columns
    pub fn with_columns(mut self, columns: Vec<ColumnDeclaration>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: mark as view
    pub fn with_view(mut self, is_view: bool) -> Self {
        self.is_view = is_view;
        self
    }

    /// Find a column by name, returning its index
    pub fn find_column(&self, name: &str) -> Option<(u32, &ColumnDeclaration)> {
        let exact = self.columns.iter().position(|c| c.name == name);
        let index = exact.or_else(|| self.columns.iter().position(|c| names_match(&c.name, name)))?;
        Some((index as u32, &self.columns[index]))
    }

    pub fn qualified_name(&self) -> QualifiedTableName {
        QualifiedTableName {
            database: Some(self.database_name.clone()),
            schema: Some(self.schema_name.clone()),
            table: self.table_name.clone(),
        }
    }
}

/// A possibly partially qualified table name
///
/// Missing qualifiers act as wildcards during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedTableName {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl QualifiedTableName {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            database: None,
            schema: None,
            table: table.into(),
        }
    }

    /// Builder method: set schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method: set database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Build from a dotted path of one to three names
    pub fn from_path(path: &[String]) -> Option<Self> {
        match path {
            [table] => Some(Self::new(table.clone())),
            [schema, table] => Some(Self::new(table.clone()).with_schema(schema.clone())),
            [database, schema, table] => Some(
                Self::new(table.clone())
                    .with_schema(schema.clone())
                    .with_database(database.clone()),
            ),
            _ => None,
        }
    }

    /// Fill missing qualifiers with defaults
    pub fn expand(&self, default_database: &str, default_schema: &str) -> Self {
        Self {
            database: Some(
                self.database
                    .clone()
                    .unwrap_or_else(|| default_database.to_string()),
            ),
            schema: Some(
                self.schema
                    .clone()
                    .unwrap_or_else(|| default_schema.to_string()),
            ),
            table: self.table.clone(),
        }
    }
}

impl fmt::Display for QualifiedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.database, &self.schema].into_iter().flatten() {
            if !part.is_empty() {
                write!(f, "{part}.")?;
            }
        }
        write!(f, "{}", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_column_prefers_exact_case() {
        let table = TableDeclaration::new(ExternalObjectId::new(1, 0), "t").with_columns(vec![
            ColumnDeclaration::new("Name").with_type(DataType::Text),
            ColumnDeclaration::new("name"),
        ]);
        assert_eq!(table.find_column("name").unwrap().0, 1);
        assert_eq!(table.find_column("Name").unwrap().0, 0);
        assert_eq!(table.find_column("NAME").unwrap().0, 0);
        assert!(table.find_column("other").is_none());
    }

    #[test]
    fn test_qualified_name_from_path() {
        let path = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let name = QualifiedTableName::from_path(&path(&["db", "s", "t"])).unwrap();
        assert_eq!(name.to_string(), "db.s.t");
        let name = QualifiedTableName::from_path(&path(&["t"])).unwrap();
        assert_eq!(name.expand("", "main").to_string(), "main.t");
        assert!(QualifiedTableName::from_path(&[]).is_none());
        assert!(QualifiedTableName::from_path(&path(&["a", "b", "c", "d"])).is_none());
    }

    #[test]
    fn test_primary_key_is_not_nullable() {
        let column = ColumnDeclaration::new("id").with_type(DataType::Integer).with_primary_key(true);
        assert!(!column.nullable);
    }
}
