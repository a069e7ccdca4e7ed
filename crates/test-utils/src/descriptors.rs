// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Schema descriptor builders for descriptor pool tests

use sqlscript_catalog::{
    Catalog, CatalogResult, ColumnDescriptor, Rank, SchemaDescriptor, TableDescriptor,
};
use sqlscript_ir::CatalogEntryId;

/// Builder for a [`SchemaDescriptor`] with a fluent API
#[derive(Debug, Clone)]
pub struct SchemaDescriptorBuilder {
    descriptor: SchemaDescriptor,
}

impl Default for SchemaDescriptorBuilder {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl SchemaDescriptorBuilder {
    pub fn new(database_name: &str, schema_name: &str) -> Self {
        Self {
            descriptor: SchemaDescriptor::new(database_name, schema_name),
        }
    }

    /// Add a table with untyped columns
    pub fn table(mut self, table_name: &str, columns: &[&str]) -> Self {
        self.descriptor.tables.push(
            TableDescriptor::new(table_name)
                .with_columns(columns.iter().map(|c| ColumnDescriptor::new(*c)).collect()),
        );
        self
    }

    /// Add a table with `(name, type)` columns
    pub fn typed_table(mut self, table_name: &str, columns: &[(&str, &str)]) -> Self {
        self.descriptor.tables.push(
            TableDescriptor::new(table_name).with_columns(
                columns
                    .iter()
                    .map(|(name, data_type)| ColumnDescriptor::new(*name).with_type(*data_type))
                    .collect(),
            ),
        );
        self
    }

    /// Add a table with a pinned table id
    pub fn table_with_id(mut self, table_id: u32, table_name: &str, columns: &[&str]) -> Self {
        self.descriptor.tables.push(
            TableDescriptor::new(table_name)
                .with_id(table_id)
                .with_columns(columns.iter().map(|c| ColumnDescriptor::new(*c)).collect()),
        );
        self
    }

    /// A subset of TPC-H as a descriptor
    pub fn tpch(database_name: &str, schema_name: &str) -> Self {
        Self::new(database_name, schema_name)
            .typed_table(
                "customer",
                &[
                    ("c_custkey", "integer"),
                    ("c_name", "varchar(25)"),
                    ("c_nationkey", "integer"),
                    ("c_acctbal", "decimal(15,2)"),
                ],
            )
            .typed_table(
                "orders",
                &[
                    ("o_orderkey", "integer"),
                    ("o_custkey", "integer"),
                    ("o_totalprice", "decimal(15,2)"),
                    ("o_orderdate", "date"),
                ],
            )
            .typed_table(
                "nation",
                &[("n_nationkey", "integer"), ("n_name", "char(25)")],
            )
    }

    pub fn build(self) -> SchemaDescriptor {
        self.descriptor
    }

    /// The descriptor as camelCase JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.descriptor).unwrap_or_else(|e| panic!("descriptor to JSON: {e}"))
    }
}

/// Catalog with one descriptor pool holding `descriptors`
pub fn catalog_with_pool(
    pool_id: CatalogEntryId,
    rank: Rank,
    descriptors: &[SchemaDescriptor],
) -> CatalogResult<Catalog> {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(pool_id, rank)?;
    catalog.add_schema_descriptors(pool_id, descriptors)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tables() {
        let descriptor = SchemaDescriptorBuilder::new("db", "public")
            .table("a", &["x", "y"])
            .table_with_id(7, "b", &["z"])
            .build();
        assert_eq!(descriptor.tables.len(), 2);
        assert_eq!(descriptor.tables[0].columns.len(), 2);
        assert_eq!(descriptor.tables[1].table_id, Some(7));
    }

    #[test]
    fn test_json_shape() {
        let json = SchemaDescriptorBuilder::new("db", "").table("a", &["x"]).to_json();
        assert!(json.contains("\"databaseName\":\"db\""));
        assert!(json.contains("\"columnName\":\"x\""));
    }

    #[test]
    fn test_catalog_with_pool() {
        let catalog =
            catalog_with_pool(10, 1, &[SchemaDescriptorBuilder::tpch("", "").build()]).unwrap();
        assert!(catalog.contains_entry_id(10));
        assert_eq!(catalog.ranked_tables().count(), 3);
    }
}
