//! Schema introspection trait and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection capability of a connection
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List tables and views in a schema (defaults to the driver's default schema)
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>>;

    /// Get the declared columns of a table, in ordinal order
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>>;
}

/// Table information (basic)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
    pub table_type: TableType,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, table_type: TableType) -> Self {
        Self {
            schema: None,
            name: name.into(),
            table_type,
        }
    }
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Table,
    View,
    ForeignTable,
}

impl TableType {
    /// Map an `information_schema.tables.table_type` value
    pub fn from_information_schema(value: &str) -> Self {
        match value {
            "VIEW" => TableType::View,
            "FOREIGN" | "FOREIGN TABLE" => TableType::ForeignTable,
            _ => TableType::Table,
        }
    }
}

/// Column information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
        }
    }
}
