//! SQL execution against an open handle

use async_trait::async_trait;
use hoprun_core::{Connection, QueryResult};

use crate::{PipelineError, PipelineResult};

/// Runs a SQL string on a handle and collects every row
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, conn: &dyn Connection, sql: &str) -> PipelineResult<QueryResult>;
}

/// Executes the statement verbatim through the handle's raw query path.
///
/// No row cap and no transaction wrapping. A statement producing no rows
/// yields an empty result.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawQueryExecutor;

#[async_trait]
impl QueryExecutor for RawQueryExecutor {
    #[tracing::instrument(skip(self, conn, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, conn: &dyn Connection, sql: &str) -> PipelineResult<QueryResult> {
        let result = conn
            .query(sql, &[])
            .await
            .map_err(PipelineError::Execution)?;

        tracing::debug!(
            row_count = result.row_count(),
            execution_time_ms = result.execution_time_ms,
            "statement executed"
        );
        Ok(result)
    }
}
