//! Stored records

use chrono::{DateTime, Utc};
use hoprun_core::TlsMode;
use serde::Serialize;
use uuid::Uuid;

/// A registered user
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A project, owned by one user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Connection details of a project's target database
#[derive(Clone, Debug)]
pub struct ConnectionRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    /// `base64(nonce || ciphertext)` of the password
    pub encrypted_password: String,
    pub ssl_mode: TlsMode,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`ConnectionRecord`]
#[derive(Clone, Debug)]
pub struct NewConnection {
    pub project_id: Uuid,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub encrypted_password: String,
    pub ssl_mode: TlsMode,
}
