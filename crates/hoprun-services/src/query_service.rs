//! Natural-language query orchestration
//!
//! One request runs a fixed pipeline:
//! resolve → connect → describe schema → translate → execute → format.
//! Any failure short-circuits. The target handle opened for the request is
//! closed on every path.

use async_trait::async_trait;
use hoprun_core::{Connection, ConnectionConfig, DatabaseDriver};
use hoprun_query::{
    FormattedResult, PipelineError, QueryExecutor, ResultFormatter, SchemaDescriber,
    SqlTranslator,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ServiceError, ServiceResult};

/// Finds the target database of a project for a user
#[async_trait]
pub trait ConnectionResolver: Send + Sync {
    /// Fails with [`ServiceError::NotFound`] if the project is missing, owned by
    /// someone else, or has no connection.
    async fn resolve(&self, user_id: Uuid, project_id: Uuid) -> ServiceResult<ConnectionConfig>;
}

/// A natural-language question about a project's database
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub project_id: Uuid,
    pub query: String,
    /// Visualization hint, empty for raw rows
    pub visualization: String,
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The SQL that was executed
    pub sql: String,
    pub payload: FormattedResult,
}

/// Query orchestrator
pub struct QueryService {
    resolver: Arc<dyn ConnectionResolver>,
    driver: Arc<dyn DatabaseDriver>,
    describer: Arc<dyn SchemaDescriber>,
    translator: Arc<dyn SqlTranslator>,
    executor: Arc<dyn QueryExecutor>,
    formatter: Arc<dyn ResultFormatter>,
}

impl QueryService {
    pub fn new(
        resolver: Arc<dyn ConnectionResolver>,
        driver: Arc<dyn DatabaseDriver>,
        describer: Arc<dyn SchemaDescriber>,
        translator: Arc<dyn SqlTranslator>,
        executor: Arc<dyn QueryExecutor>,
        formatter: Arc<dyn ResultFormatter>,
    ) -> Self {
        Self {
            resolver,
            driver,
            describer,
            translator,
            executor,
            formatter,
        }
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %user_id, project_id = %request.project_id))]
    pub async fn run(&self, user_id: Uuid, request: &QueryRequest) -> ServiceResult<QueryOutcome> {
        if request.query.trim().is_empty() {
            return Err(ServiceError::Validation("query must not be empty".to_string()));
        }

        let config = self.resolver.resolve(user_id, request.project_id).await?;

        let conn = self.driver.connect(&config).await.map_err(|e| {
            tracing::warn!(
                error = %e,
                target = %self.driver.build_connection_string(&config),
                "failed to open target database"
            );
            ServiceError::UpstreamUnavailable(e.to_string())
        })?;

        let outcome = self.run_on(conn.as_ref(), request).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close target database handle");
        }

        let outcome = outcome?;
        tracing::info!(row_count = outcome.payload.row_count(), "query answered");
        Ok(outcome)
    }

    async fn run_on(
        &self,
        conn: &dyn Connection,
        request: &QueryRequest,
    ) -> ServiceResult<QueryOutcome> {
        let schema = self.describer.describe(conn).await?;

        let sql = self
            .translator
            .translate(&request.query, &schema)
            .await
            .map_err(PipelineError::from)?;
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "translated");

        let result = self.executor.execute(conn, &sql).await?;
        let payload = self.formatter.format(result, &request.visualization);

        Ok(QueryOutcome { sql, payload })
    }
}
