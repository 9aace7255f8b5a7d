//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use hoprun_core::{
    ColumnInfo, Connection, ConnectionConfig, DatabaseDriver, HoprunError, QueryResult, Result,
    SchemaIntrospection, TableInfo, TableType, Value,
};
use hoprun_query::{
    CompletionError, CompletionProvider, CompletionRequest, CompletionResponse, CompletionResult,
};
use hoprun_services::{ConnectionResolver, ServiceError, ServiceResult};
use hoprun_storage::{CredentialCipher, LocalStorage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

/// Mock connection for testing the pipeline without a real database.
///
/// Queries are answered by SQL pattern; catalog calls return the configured
/// tables. Every call is logged for assertions.
pub struct MockConnection {
    pub tables: Vec<(TableInfo, Vec<ColumnInfo>)>,
    pub query_responses: Vec<(String, QueryResult)>,
    pub fail_queries: bool,
    pub fail_introspection: bool,
    pub query_log: Mutex<Vec<String>>,
    close_count: AtomicUsize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            query_responses: Vec::new(),
            fail_queries: false,
            fail_introspection: false,
            query_log: Mutex::new(Vec::new()),
            close_count: AtomicUsize::new(0),
        }
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(ordinal, (column, data_type))| ColumnInfo {
                ordinal: ordinal + 1,
                ..ColumnInfo::new(*column, *data_type)
            })
            .collect();
        self.tables
            .push((TableInfo::new(name, TableType::Table), columns));
        self
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(mut self, sql_contains: &str, result: QueryResult) -> Self {
        self.query_responses.push((sql_contains.to_string(), result));
        self
    }

    pub fn with_failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn with_failing_introspection(mut self) -> Self {
        self.fail_introspection = true;
        self
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.query_log.lock().push(sql.to_string());

        if self.fail_queries {
            return Err(HoprunError::Query(format!(
                "relation in \"{sql}\" does not exist"
            )));
        }

        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for MockConnection {
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        if self.fail_introspection {
            return Err(HoprunError::Schema("permission denied for schema public".into()));
        }
        Ok(self.tables.iter().map(|(table, _)| table.clone()).collect())
    }

    async fn get_columns(&self, _schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .tables
            .iter()
            .find(|(info, _)| info.name == table)
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }
}

/// Driver handing out one shared mock connection
pub struct MockDriver {
    pub connection: Arc<MockConnection>,
    pub fail_connect: bool,
    pub connect_log: Mutex<Vec<ConnectionConfig>>,
}

impl MockDriver {
    pub fn new(connection: MockConnection) -> Self {
        Self {
            connection: Arc::new(connection),
            fail_connect: false,
            connect_log: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::new(MockConnection::new())
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connect_log.lock().len()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.connect_log.lock().push(config.clone());
        if self.fail_connect {
            return Err(HoprunError::Connection("connection refused".into()));
        }
        Ok(self.connection.clone())
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        format!("mock://{}/{}", config.host, config.database)
    }
}

/// Completion provider returning a canned answer and recording prompts
pub struct MockCompletionProvider {
    pub answer: CompletionResult<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: CompletionError) -> Self {
        Self {
            answer: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        self.prompts.lock().push(request.prompt);
        self.answer.clone().map(|text| CompletionResponse {
            text,
            tokens_used: None,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-1"
    }
}

/// Resolver knowing exactly one (user, project) pair
pub struct StaticResolver {
    pub user_id: Uuid,
    pub project_id: Uuid,
}

#[async_trait]
impl ConnectionResolver for StaticResolver {
    async fn resolve(&self, user_id: Uuid, project_id: Uuid) -> ServiceResult<ConnectionConfig> {
        if user_id != self.user_id || project_id != self.project_id {
            return Err(ServiceError::NotFound(format!("project {project_id}")));
        }
        Ok(ConnectionConfig::new_postgres("target.local", 5432, "shop", "reader")
            .with_password("pw"))
    }
}

/// Fresh storage in a temporary directory
pub fn temp_storage() -> (TempDir, LocalStorage) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = LocalStorage::open(dir.path().join("hoprun.db")).expect("open storage");
    (dir, storage)
}

pub fn test_cipher() -> Arc<CredentialCipher> {
    let key = CredentialCipher::generate_key().expect("key");
    Arc::new(CredentialCipher::from_base64(&key).expect("cipher"))
}

/// `users(id, email)` result with `count` rows
pub fn users_result(count: i64) -> QueryResult {
    QueryResult::from_rows(
        &["id", "email"],
        (1..=count)
            .map(|id| vec![Value::Int(id), Value::from(format!("user{id}@example.com"))])
            .collect(),
    )
}
