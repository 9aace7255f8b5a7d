//! Target-database connections of projects
//!
//! A project has at most one connection. Passwords are encrypted before they
//! are stored and decrypted only when the query pipeline resolves a project.

use async_trait::async_trait;
use hoprun_core::{ConnectionConfig, SessionOptions};
use hoprun_storage::{CredentialCipher, LocalStorage, NewConnection, StorageError, StorageResult};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AddConnection, ConnectionResolver, ConnectionSummary, ServiceError, ServiceResult};

/// Service for per-project connection management
pub struct ConnectionService {
    storage: LocalStorage,
    cipher: Arc<CredentialCipher>,
    session: SessionOptions,
}

impl ConnectionService {
    pub fn new(storage: LocalStorage, cipher: Arc<CredentialCipher>) -> Self {
        Self {
            storage,
            cipher,
            session: SessionOptions::default(),
        }
    }

    /// Session options applied to every resolved connection
    pub fn with_session(mut self, session: SessionOptions) -> Self {
        self.session = session;
        self
    }

    /// Add the connection of a project owned by `user_id`.
    ///
    /// Fails with [`ServiceError::LimitReached`] if the project already has
    /// one, leaving stored state untouched.
    #[tracing::instrument(skip(self, input), fields(user_id = %user_id, project_id = %input.project_id))]
    pub async fn add_connection(
        &self,
        user_id: Uuid,
        input: AddConnection,
    ) -> ServiceResult<ConnectionSummary> {
        for (field, value) in [
            ("db_host", &input.host),
            ("db_name", &input.database),
            ("db_user", &input.username),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!("{field} must not be empty")));
            }
        }
        if input.port == 0 {
            return Err(ServiceError::Validation(
                "db_port must be between 1 and 65535".to_string(),
            ));
        }

        let encrypted_password = self.cipher.encrypt(&input.password)?;
        let new = NewConnection {
            project_id: input.project_id,
            host: input.host.trim().to_string(),
            port: input.port,
            database: input.database,
            username: input.username,
            encrypted_password,
            ssl_mode: input.ssl_mode,
        };

        let record = self
            .storage
            .run(move |storage| storage.add_connection(user_id, new))
            .await?;

        tracing::info!(connection_id = %record.id, "connection added");
        Ok(record.into())
    }

    /// Connections of a project owned by `user_id`, without passwords
    pub async fn list_connections(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> ServiceResult<Vec<ConnectionSummary>> {
        let records = self
            .storage
            .run(move |storage| -> StorageResult<_> {
                if storage.get_project(user_id, project_id)?.is_none() {
                    return Err(StorageError::NotFound(format!("project {project_id}")));
                }
                storage.list_connections(project_id)
            })
            .await?;

        Ok(records.into_iter().map(ConnectionSummary::from).collect())
    }
}

#[async_trait]
impl ConnectionResolver for ConnectionService {
    #[tracing::instrument(skip(self), fields(user_id = %user_id, project_id = %project_id))]
    async fn resolve(&self, user_id: Uuid, project_id: Uuid) -> ServiceResult<ConnectionConfig> {
        let record = self
            .storage
            .run(move |storage| -> StorageResult<_> {
                if storage.get_project(user_id, project_id)?.is_none() {
                    return Err(StorageError::NotFound(format!("project {project_id}")));
                }
                storage
                    .connection_for_project(project_id)?
                    .ok_or_else(|| StorageError::NotFound(format!("connection for project {project_id}")))
            })
            .await?;

        let password = self.cipher.decrypt(&record.encrypted_password)?;

        Ok(
            ConnectionConfig::new_postgres(&record.host, record.port, &record.database, &record.username)
                .with_password(password)
                .with_tls_mode(record.ssl_mode)
                .with_session(self.session.clone()),
        )
    }
}
