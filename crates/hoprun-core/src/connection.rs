//! Connection trait

use crate::{QueryResult, Result, SchemaIntrospection, Value};
use async_trait::async_trait;

/// A live handle to a target database.
///
/// Handles are opened per request and must be released on every exit path:
/// callers invoke [`Connection::close`], and implementations also release
/// their resources when dropped.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql")
    fn driver_name(&self) -> &str;

    /// Run a statement and return every row it produces.
    ///
    /// Statements that produce no rows (DDL, DML without RETURNING, or a
    /// SELECT matching nothing) return an empty result, not an error.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}
