//! Database driver trait definition

use crate::{Connection, Result, TlsMode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Core driver trait that opens handles to target databases
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// Display name for logs
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Default connection port
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Open a new connection. Each call returns an independent handle.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open, ping and close a connection
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        let ping = conn.query("SELECT 1", &[]).await;
        conn.close().await?;
        ping.map(|_| ())
    }

    /// Build a connection string with the password redacted, for logs
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Session options applied to every handle opened from a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Server-side statement timeout
    pub statement_timeout: Option<Duration>,
    /// Open sessions with `default_transaction_read_only` on
    pub read_only: bool,
    /// Client-side connect timeout
    pub connect_timeout: Option<Duration>,
}

/// Connection configuration for a target database
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "postgres")
    pub driver: String,
    /// Host address
    pub host: String,
    /// Port number (0 for the driver default)
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username
    pub username: String,
    /// Plaintext password, only ever held in memory
    pub password: Option<String>,
    /// TLS mode
    pub tls_mode: TlsMode,
    /// Session options
    pub session: SessionOptions,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a PostgreSQL configuration
    pub fn new_postgres(host: &str, port: u16, database: &str, username: &str) -> Self {
        Self {
            driver: "postgres".to_string(),
            host: host.to_string(),
            port,
            database: database.to_string(),
            username: username.to_string(),
            password: None,
            tls_mode: TlsMode::default(),
            session: SessionOptions::default(),
            params: HashMap::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_tls_mode(mut self, mode: TlsMode) -> Self {
        self.tls_mode = mode;
        self
    }

    pub fn with_session(mut self, session: SessionOptions) -> Self {
        self.session = session;
        self
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get port, falling back to `default`
    pub fn port_or(&self, default: u16) -> u16 {
        if self.port > 0 { self.port } else { default }
    }
}

// Never print the password.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls_mode", &self.tls_mode)
            .field("session", &self.session)
            .field("params", &self.params)
            .finish()
    }
}
