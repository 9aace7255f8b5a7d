//! PostgreSQL schema introspection implementation

use async_trait::async_trait;
use hoprun_core::{
    ColumnInfo, Connection, Result, SchemaIntrospection, TableInfo, TableType, Value,
};

use crate::PostgresConnection;

const DEFAULT_SCHEMA: &str = "public";

#[async_trait]
impl SchemaIntrospection for PostgresConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        let result = self
            .query(
                "SELECT table_name::text, table_type::text
                 FROM information_schema.tables
                 WHERE table_schema = $1
                 ORDER BY table_name",
                &[Value::Text(schema.to_string())],
            )
            .await?;

        let tables = result
            .rows
            .iter()
            .map(|row| {
                let name = row
                    .get(0)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let table_type = row
                    .get(1)
                    .and_then(|v| v.as_str())
                    .map(TableType::from_information_schema)
                    .unwrap_or(TableType::Table);

                TableInfo {
                    schema: Some(schema.to_string()),
                    name,
                    table_type,
                }
            })
            .collect();

        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        let result = self
            .query(
                "SELECT column_name::text, data_type::text, is_nullable::text,
                        column_default::text, ordinal_position::int4
                 FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2
                 ORDER BY ordinal_position",
                &[
                    Value::Text(schema.to_string()),
                    Value::Text(table.to_string()),
                ],
            )
            .await?;

        let columns = result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                name: row
                    .get(0)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                data_type: row
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                nullable: row.get(2).and_then(|v| v.as_str()) != Some("NO"),
                default_value: row.get(3).and_then(|v| v.as_str()).map(String::from),
                ordinal: row.get(4).and_then(|v| v.as_i64()).unwrap_or(0) as usize,
            })
            .collect();

        Ok(columns)
    }
}
