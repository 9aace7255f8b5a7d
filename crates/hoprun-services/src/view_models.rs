//! Caller-facing shapes of stored records

use chrono::{DateTime, Utc};
use hoprun_core::TlsMode;
use hoprun_storage::ConnectionRecord;
use serde::Serialize;
use uuid::Uuid;

/// Input for [`crate::ConnectionService::add_connection`]
#[derive(Clone)]
pub struct AddConnection {
    pub project_id: Uuid,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: TlsMode,
}

impl std::fmt::Debug for AddConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddConnection")
            .field("project_id", &self.project_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// A stored connection without its password
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub ssl_mode: TlsMode,
    pub created_at: DateTime<Utc>,
}

impl From<ConnectionRecord> for ConnectionSummary {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            db_host: record.host,
            db_port: record.port,
            db_name: record.database,
            db_user: record.username,
            ssl_mode: record.ssl_mode,
            created_at: record.created_at,
        }
    }
}
