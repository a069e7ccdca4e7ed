// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Schema descriptors
//!
//! Descriptors are the external way to feed tables into a descriptor pool.
//! They deserialize from camelCase JSON:
//!
//! ```json
//! {
//!   "databaseName": "db1",
//!   "schemaName": "public",
//!   "tables": [
//!     { "tableName": "nation", "columns": [{ "columnName": "n_name", "dataType": "text" }] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A column of a [`TableDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub column_name: String,
    /// SQL type name, e.g. `varchar(25)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: None,
        }
    }

    /// Builder method: set the SQL type name
    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

/// A table of a [`SchemaDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    /// Object id within the pool, assigned sequentially when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<u32>,
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_id: None,
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    /// Builder method: pin the table id
    pub fn with_id(mut self, table_id: u32) -> Self {
        self.table_id = Some(table_id);
        self
    }

    /// Builder method: set columns
    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }
}

/// Tables of one `database.schema`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub schema_name: String,
    #[serde(default)]
    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(database_name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            schema_name: schema_name.into(),
            tables: Vec::new(),
        }
    }

    /// Builder method: set tables
    pub fn with_tables(mut self, tables: Vec<TableDescriptor>) -> Self {
        self.tables = tables;
        self
    }

    /// Parse one descriptor or an array of descriptors
    pub fn list_from_json(bytes: &[u8]) -> Result<Vec<SchemaDescriptor>, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<SchemaDescriptor>),
            One(SchemaDescriptor),
        }
        Ok(match serde_json::from_slice::<OneOrMany>(bytes)? {
            OneOrMany::Many(list) => list,
            OneOrMany::One(one) => vec![one],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_descriptor() {
        let json = br#"{
            "databaseName": "db1",
            "schemaName": "schema1",
            "tables": [
                { "tableName": "t", "columns": [{ "columnName": "a", "dataType": "int" }] }
            ]
        }"#;
        let list = SchemaDescriptor::list_from_json(json).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].database_name, "db1");
        assert_eq!(list[0].tables[0].table_id, None);
        assert_eq!(list[0].tables[0].columns[0].data_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_parse_descriptor_list() {
        let json = br#"[{ "schemaName": "a" }, { "schemaName": "b", "tables": [{ "tableId": 4, "tableName": "x" }] }]"#;
        let list = SchemaDescriptor::list_from_json(json).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].database_name, "");
        assert_eq!(list[1].tables[0].table_id, Some(4));
    }

    #[test]
    fn test_reject_malformed_descriptor() {
        assert!(SchemaDescriptor::list_from_json(b"{\"tables\": 3}").is_err());
        assert!(SchemaDescriptor::list_from_json(b"not json").is_err());
    }
}
