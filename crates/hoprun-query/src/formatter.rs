//! Result shaping per visualization hint

use hoprun_core::{QueryResult, Row, RowValues, unique_column_names};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Visualization hint sent with a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visualization {
    /// Array of row objects
    #[default]
    Raw,
    /// Column names plus rows as positional arrays
    Table,
}

impl Visualization {
    /// Unknown and empty hints fall back to [`Visualization::Raw`]
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_ascii_lowercase().as_str() {
            "table" => Visualization::Table,
            _ => Visualization::Raw,
        }
    }
}

/// Caller-facing payload of a query
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedResult {
    Rows(Vec<Row>),
    Table { columns: Vec<String>, rows: Vec<Row> },
}

impl FormattedResult {
    pub fn row_count(&self) -> usize {
        match self {
            FormattedResult::Rows(rows) => rows.len(),
            FormattedResult::Table { rows, .. } => rows.len(),
        }
    }
}

impl Serialize for FormattedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormattedResult::Rows(rows) => rows.serialize(serializer),
            FormattedResult::Table { columns, rows } => {
                let values: Vec<RowValues<'_>> = rows.iter().map(RowValues).collect();
                let mut state = serializer.serialize_struct("Table", 2)?;
                state.serialize_field("columns", columns)?;
                state.serialize_field("rows", &values)?;
                state.end()
            }
        }
    }
}

/// Shapes an executed result for the caller
pub trait ResultFormatter: Send + Sync {
    fn format(&self, result: QueryResult, hint: &str) -> FormattedResult;
}

/// Identity for raw hints, column-major for `"table"`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl ResultFormatter for DefaultFormatter {
    fn format(&self, result: QueryResult, hint: &str) -> FormattedResult {
        match Visualization::from_hint(hint) {
            Visualization::Raw => FormattedResult::Rows(result.rows),
            Visualization::Table => {
                let names: Vec<String> = result.columns.into_iter().map(|c| c.name).collect();
                FormattedResult::Table {
                    columns: unique_column_names(&names)
                        .into_iter()
                        .map(|name| name.into_owned())
                        .collect(),
                    rows: result.rows,
                }
            }
        }
    }
}
