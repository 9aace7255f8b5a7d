//! Schema description for prompts

use async_trait::async_trait;
use hoprun_core::{ColumnInfo, Connection, TableInfo, TableType};
use std::fmt::Write;

use crate::{PipelineError, PipelineResult};

/// Renders the live schema of a handle as prompt text
#[async_trait]
pub trait SchemaDescriber: Send + Sync {
    async fn describe(&self, conn: &dyn Connection) -> PipelineResult<String>;
}

/// Describes the driver's default schema (`public` on PostgreSQL) through
/// the handle's catalog introspection
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationSchemaDescriber;

impl InformationSchemaDescriber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SchemaDescriber for InformationSchemaDescriber {
    #[tracing::instrument(skip_all, fields(driver = conn.driver_name()))]
    async fn describe(&self, conn: &dyn Connection) -> PipelineResult<String> {
        let introspection = conn.as_schema_introspection().ok_or_else(|| {
            PipelineError::IntrospectionUnsupported {
                driver: conn.driver_name().to_string(),
            }
        })?;

        let tables = introspection
            .list_tables(None)
            .await
            .map_err(PipelineError::Introspection)?;

        let mut described = Vec::with_capacity(tables.len());
        for table in tables {
            let columns = introspection
                .get_columns(None, &table.name)
                .await
                .map_err(PipelineError::Introspection)?;
            described.push((table, columns));
        }

        tracing::debug!(table_count = described.len(), "schema introspected");
        Ok(render_schema(described))
    }
}

/// Render tables and their columns as blank-line separated blocks.
///
/// Tables are sorted by name and columns by ordinal.
pub fn render_schema(mut tables: Vec<(TableInfo, Vec<ColumnInfo>)>) -> String {
    tables.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

    let mut out = String::new();
    for (table, mut columns) in tables {
        columns.sort_by_key(|c| c.ordinal);

        let label = match table.table_type {
            TableType::View => "View",
            TableType::Table | TableType::ForeignTable => "Table",
        };
        let _ = writeln!(out, "{} {}:", label, table.name);
        for column in &columns {
            let _ = writeln!(out, "  {} ({})", column.name, column.data_type);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn column(name: &str, data_type: &str, ordinal: usize) -> ColumnInfo {
        ColumnInfo {
            ordinal,
            ..ColumnInfo::new(name, data_type)
        }
    }

    #[test]
    fn renders_one_block_per_table_in_name_order() {
        let rendered = render_schema(vec![
            (
                TableInfo::new("users", TableType::Table),
                vec![column("email", "text", 2), column("id", "integer", 1)],
            ),
            (
                TableInfo::new("orders", TableType::Table),
                vec![column("id", "integer", 1), column("total", "numeric", 2)],
            ),
            (
                TableInfo::new("active_users", TableType::View),
                vec![column("id", "integer", 1)],
            ),
        ]);

        assert_eq!(
            rendered,
            indoc! {"
                View active_users:
                  id (integer)

                Table orders:
                  id (integer)
                  total (numeric)

                Table users:
                  id (integer)
                  email (text)

            "}
        );
    }

    #[test]
    fn empty_schema_renders_empty_string() {
        assert_eq!(render_schema(Vec::new()), "");
    }
}
