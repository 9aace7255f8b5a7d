//! PostgreSQL driver implementation

use async_trait::async_trait;
use hoprun_core::{Connection, ConnectionConfig, DatabaseDriver, Result};
use std::sync::Arc;

use crate::PostgresConnection;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = %config.database))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = PostgresConnection::connect(config).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to connect to PostgreSQL database");
            e
        })?;
        Ok(Arc::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let mut conn_str = String::from("postgresql://");

        if !config.username.is_empty() {
            conn_str.push_str(&config.username);
            if config.password.is_some() {
                conn_str.push_str(":***");
            }
            conn_str.push('@');
        }

        conn_str.push_str(&format!(
            "{}:{}/{}",
            config.host,
            config.port_or(5432),
            config.database
        ));

        conn_str
    }
}
