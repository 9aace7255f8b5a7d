//! Local SQLite storage for users, projects and connections

use chrono::{DateTime, SecondsFormat, Utc};
use hoprun_core::TlsMode;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::{ConnectionRecord, NewConnection, Project, StorageError, StorageResult, User};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Local storage manager using SQLite.
///
/// Every operation opens its own connection, so a `LocalStorage` can be
/// cloned freely and used from any blocking thread.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    db_path: PathBuf,
}

impl LocalStorage {
    /// Open (creating if needed) the database at `db_path`
    pub fn open(db_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let storage = Self { db_path };
        storage.initialize_schema()?;

        tracing::info!(path = %storage.db_path.display(), "local storage ready");
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a blocking operation against storage on the blocking thread pool.
    ///
    /// The operation may return any error a [`StorageError`] converts into,
    /// so callers can mix storage calls with their own blocking work.
    pub async fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&LocalStorage) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|e| E::from(StorageError::Task(e.to_string())))?
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> StorageResult<()> {
        let conn = self.connect()?;

        // WAL lets readers proceed while a connection is being added
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_projects_user
            ON projects(user_id, created_at);

            CREATE TABLE IF NOT EXISTS database_connections (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                db_host TEXT NOT NULL,
                db_port INTEGER NOT NULL,
                db_name TEXT NOT NULL,
                db_user TEXT NOT NULL,
                db_password TEXT NOT NULL,
                ssl_mode TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_database_connections_project
            ON database_connections(project_id);",
        )?;

        Ok(())
    }

    /// Get a database connection
    fn connect(&self) -> StorageResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Insert a user. A taken email is a [`StorageError::Conflict`].
    pub fn create_user(&self, email: &str, password_hash: &str) -> StorageResult<User> {
        let conn = self.connect()?;
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                format_time(&user.created_at),
            ],
        )
        .map_err(|e| {
            if StorageError::is_unique_violation(&e) {
                StorageError::Conflict(format!("user {}", email))
            } else {
                StorageError::Sqlite(e)
            }
        })?;

        tracing::debug!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Number of users registered with an email
    pub fn count_users_with_email(&self, email: &str) -> StorageResult<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn create_project(&self, user_id: Uuid, name: &str) -> StorageResult<Project> {
        let conn = self.connect()?;
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            user_id,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO projects (id, name, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                project.id.to_string(),
                project.name,
                project.user_id.to_string(),
                format_time(&project.created_at),
            ],
        )?;

        tracing::debug!(project_id = %project.id, user_id = %user_id, "project created");
        Ok(project)
    }

    /// The user's projects, newest first
    pub fn list_projects(&self, user_id: Uuid, limit: usize) -> StorageResult<Vec<Project>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, user_id, created_at FROM projects
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let projects = stmt
            .query_map(params![user_id.to_string(), limit as i64], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// A project, only if it belongs to `user_id`
    pub fn get_project(&self, user_id: Uuid, project_id: Uuid) -> StorageResult<Option<Project>> {
        let conn = self.connect()?;
        let project = conn
            .query_row(
                "SELECT id, name, user_id, created_at FROM projects
                 WHERE id = ?1 AND user_id = ?2",
                params![project_id.to_string(), user_id.to_string()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Add the connection of a project owned by `user_id`.
    ///
    /// The ownership check, the one-connection limit and the insert run in a
    /// single IMMEDIATE transaction, so concurrent adds cannot both succeed.
    pub fn add_connection(
        &self,
        user_id: Uuid,
        new: NewConnection,
    ) -> StorageResult<ConnectionRecord> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1 AND user_id = ?2",
                params![new.project_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(StorageError::NotFound(format!("project {}", new.project_id)));
        }

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM database_connections WHERE project_id = ?1",
            params![new.project_id.to_string()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(StorageError::LimitReached {
                project_id: new.project_id,
            });
        }

        let record = ConnectionRecord {
            id: Uuid::new_v4(),
            project_id: new.project_id,
            host: new.host,
            port: new.port,
            database: new.database,
            username: new.username,
            encrypted_password: new.encrypted_password,
            ssl_mode: new.ssl_mode,
            created_at: Utc::now(),
        };

        tx.execute(
            "INSERT INTO database_connections
                (id, project_id, db_host, db_port, db_name, db_user, db_password, ssl_mode, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                record.project_id.to_string(),
                record.host,
                record.port,
                record.database,
                record.username,
                record.encrypted_password,
                record.ssl_mode.as_str(),
                format_time(&record.created_at),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            connection_id = %record.id,
            project_id = %record.project_id,
            "connection added"
        );
        Ok(record)
    }

    /// Connections of a project, oldest first
    pub fn list_connections(&self, project_id: Uuid) -> StorageResult<Vec<ConnectionRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, db_host, db_port, db_name, db_user, db_password, ssl_mode, created_at
             FROM database_connections
             WHERE project_id = ?1
             ORDER BY created_at, rowid",
        )?;

        let records = stmt
            .query_map(params![project_id.to_string()], connection_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// The connection the query pipeline targets for a project
    pub fn connection_for_project(
        &self,
        project_id: Uuid,
    ) -> StorageResult<Option<ConnectionRecord>> {
        Ok(self.list_connections(project_id)?.into_iter().next())
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to time order
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(error))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: time_column(row, 3)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        user_id: uuid_column(row, 2)?,
        created_at: time_column(row, 3)?,
    })
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRecord> {
    let ssl_mode: String = row.get(7)?;
    Ok(ConnectionRecord {
        id: uuid_column(row, 0)?,
        project_id: uuid_column(row, 1)?,
        host: row.get(2)?,
        port: row.get(3)?,
        database: row.get(4)?,
        username: row.get(5)?,
        encrypted_password: row.get(6)?,
        ssl_mode: TlsMode::parse(&ssl_mode).unwrap_or_default(),
        created_at: time_column(row, 8)?,
    })
}
