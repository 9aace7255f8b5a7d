//! Test server and collaborator stubs

#![allow(dead_code)]

use async_trait::async_trait;
use hoprun_core::{
    ColumnInfo, Connection, ConnectionConfig, DatabaseDriver, HoprunError, QueryResult, Result,
    SchemaIntrospection, SessionOptions, TableInfo, TableType, Value,
};
use hoprun_query::{CompletionProvider, CompletionRequest, CompletionResponse, CompletionResult};
use hoprun_server::{AppState, build_router};
use hoprun_services::{AccountService, PasswordHasher, TokenSigner};
use hoprun_storage::{CredentialCipher, LocalStorage};
use serde_json::Value as Json;
use std::sync::Arc;
use tempfile::TempDir;

/// Target database with a seeded `users(id, email)` table
pub struct UsersDb;

#[async_trait]
impl Connection for UsersDb {
    fn driver_name(&self) -> &str {
        "stub"
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        if !sql.contains("users") {
            return Err(HoprunError::Query(format!("syntax error in {sql}")));
        }
        Ok(QueryResult::from_rows(
            &["id", "email"],
            (1..=3)
                .map(|id| vec![Value::Int(id), Value::from(format!("user{id}@example.com"))])
                .collect(),
        ))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for UsersDb {
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        Ok(vec![TableInfo::new("users", TableType::Table)])
    }

    async fn get_columns(&self, _schema: Option<&str>, _table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(vec![
            ColumnInfo::new("id", "integer"),
            ColumnInfo {
                ordinal: 1,
                ..ColumnInfo::new("email", "text")
            },
        ])
    }
}

/// Driver that connects to [`UsersDb`] unless the host is `unreachable`
pub struct StubDriver;

#[async_trait]
impl DatabaseDriver for StubDriver {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        if config.host == "unreachable" {
            return Err(HoprunError::Connection(format!(
                "could not connect to {}:{} as {} with password {}",
                config.host,
                config.port,
                config.username,
                config.password.as_deref().unwrap_or_default()
            )));
        }
        Ok(Arc::new(UsersDb))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        format!("stub://{}:{}/{}", config.host, config.port, config.database)
    }
}

/// Provider that answers every prompt with the same SQL
pub struct StubProvider(pub &'static str);

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, _request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        Ok(CompletionResponse {
            text: self.0.to_string(),
            tokens_used: Some(12),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn(answer: &'static str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::open(dir.path().join("hoprun.db")).expect("open storage");
        let key = CredentialCipher::generate_key().expect("key");
        let tokens = TokenSigner::new(b"test-secret");

        let mut state = AppState::new(
            storage.clone(),
            tokens.clone(),
            Arc::new(CredentialCipher::from_base64(&key).expect("cipher")),
            Arc::new(StubDriver),
            Arc::new(StubProvider(answer)),
            SessionOptions::default(),
        );
        state.accounts = Arc::new(
            AccountService::new(storage, tokens)
                .with_hasher(PasswordHasher::with_iterations(1_000)),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, build_router(state))
                .await
                .expect("server");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Json) -> (u16, Json) {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("request");
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Json::Null);
        (status, body)
    }

    /// Register and log in, returning a bearer token
    pub async fn login_as(&self, email: &str) -> String {
        let credentials = serde_json::json!({"email": email, "password": "pw"});
        let (status, _) = self.post("/register", None, credentials.clone()).await;
        assert_eq!(status, 201);
        let (status, body) = self.post("/login", None, credentials).await;
        assert_eq!(status, 200);
        body["token"].as_str().expect("token").to_string()
    }

    /// Create a project and return its id
    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/project", Some(token), serde_json::json!({"name": name}))
            .await;
        assert_eq!(status, 201);
        body["id"].as_str().expect("project id").to_string()
    }
}
