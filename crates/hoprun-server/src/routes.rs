//! HTTP routes

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hoprun_core::TlsMode;
use hoprun_query::FormattedResult;
use hoprun_services::{AddConnection, ConnectionSummary, QueryRequest, ServiceError};
use hoprun_storage::{Project, User};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::AppResult;
use crate::{AppState, AuthUser, JsonBody};

/// Port used when a connection request leaves `db_port` empty
const DEFAULT_DB_PORT: u16 = 5432;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/project", post(create_project))
        .route("/getproject", post(list_projects))
        .route("/connection", post(add_connection))
        .route("/connections", post(list_connections))
        .route("/query", post(query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct CreateProjectRequest {
    name: String,
}

/// `db_port` as either a JSON number or a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u64),
    Text(String),
}

impl PortField {
    fn resolve(field: Option<PortField>) -> Result<u16, ServiceError> {
        let invalid = || ServiceError::Validation("db_port must be between 1 and 65535".to_string());
        let port = match field {
            None => return Ok(DEFAULT_DB_PORT),
            Some(PortField::Number(n)) => n,
            Some(PortField::Text(s)) if s.trim().is_empty() => return Ok(DEFAULT_DB_PORT),
            Some(PortField::Text(s)) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        };
        match u16::try_from(port) {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(invalid()),
        }
    }
}

#[derive(Deserialize)]
struct AddConnectionRequest {
    project_id: Uuid,
    db_host: String,
    #[serde(default)]
    db_port: Option<PortField>,
    db_name: String,
    db_user: String,
    #[serde(default)]
    db_password: String,
    #[serde(default)]
    ssl_mode: Option<String>,
}

impl AddConnectionRequest {
    fn into_input(self) -> Result<AddConnection, ServiceError> {
        let ssl_mode = match self.ssl_mode.as_deref() {
            None => TlsMode::default(),
            Some(mode) => TlsMode::parse(mode).ok_or_else(|| {
                ServiceError::Validation("ssl_mode must be disable, prefer or require".to_string())
            })?,
        };

        Ok(AddConnection {
            project_id: self.project_id,
            host: self.db_host,
            port: PortField::resolve(self.db_port)?,
            database: self.db_name,
            username: self.db_user,
            password: self.db_password,
            ssl_mode,
        })
    }
}

#[derive(Deserialize)]
struct ProjectRef {
    project_id: Uuid,
}

#[derive(Deserialize)]
struct QueryBody {
    project_id: Uuid,
    query: String,
    #[serde(default)]
    visualization: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.accounts.register(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.accounts.login(&body.email, &body.password).await?;
    Ok(Json(TokenResponse { token }))
}

async fn create_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = state.projects.create_project(user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// The body is ignored, the caller comes from the token
async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_projects(user_id).await?))
}

async fn add_connection(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<AddConnectionRequest>,
) -> AppResult<(StatusCode, Json<ConnectionSummary>)> {
    let input = body.into_input()?;
    let summary = state.connections.add_connection(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn list_connections(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<ProjectRef>,
) -> AppResult<Json<Vec<ConnectionSummary>>> {
    let summaries = state
        .connections
        .list_connections(user_id, body.project_id)
        .await?;
    Ok(Json(summaries))
}

async fn query(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<QueryBody>,
) -> AppResult<Json<FormattedResult>> {
    let request = QueryRequest {
        project_id: body.project_id,
        query: body.query,
        visualization: body.visualization,
    };
    let outcome = state.queries.run(user_id, &request).await?;
    Ok(Json(outcome.payload))
}
