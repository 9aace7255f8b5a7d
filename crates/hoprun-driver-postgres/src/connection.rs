//! PostgreSQL connection implementation

use async_trait::async_trait;
use bytes::BytesMut;
use hoprun_core::{
    ColumnMeta, Connection, ConnectionConfig, HoprunError, QueryResult, Result, Row,
    SchemaIntrospection, SessionOptions, TlsMode, Value,
};
use parking_lot::Mutex as SyncMutex;
use postgres_types::{FromSql, ToSql, Type};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row as PgRow};

use crate::tls::{PostgresTlsConnector, tls_mode_to_ssl_mode};

/// How long `close` waits for the connection task to flush its terminate message
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    match code.code() {
        "42P01" => format!("undefined table: {}", message),
        "42703" => format!("undefined column: {}", message),
        "42601" => format!("syntax error: {}", message),
        "25006" => format!("read-only transaction: {}", message),
        "57014" => format!("statement cancelled: {}", message),
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        _ => format!("{} (code: {})", message, code.code()),
    }
}

/// Classify a driver error: server-side rejections are query errors, the rest
/// means the session itself is gone or unreachable.
fn map_postgres_error(context: &str, error: tokio_postgres::Error) -> HoprunError {
    let message = format_postgres_error(&error);
    if error.as_db_error().is_some() {
        HoprunError::Query(format!("{}: {}", context, message))
    } else if error.is_closed() {
        HoprunError::Closed
    } else {
        HoprunError::Connection(format!("{}: {}", context, message))
    }
}

/// Render session options as a libpq `options` string
pub(crate) fn session_options_string(session: &SessionOptions) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(timeout) = session.statement_timeout {
        parts.push(format!("-c statement_timeout={}", timeout.as_millis()));
    }
    if session.read_only {
        parts.push("-c default_transaction_read_only=on".to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// A single PostgreSQL session.
///
/// The protocol connection runs on a spawned task. Closing the handle drops
/// the client, which lets that task send a terminate message and finish;
/// dropping the handle without closing aborts the task.
pub struct PostgresConnection {
    client: Mutex<Option<Client>>,
    connection_task: SyncMutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let port = config.port_or(5432);
        tracing::info!(
            host = %config.host,
            port = %port,
            database = %config.database,
            tls_mode = %config.tls_mode,
            "connecting to PostgreSQL database"
        );

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(port)
            .dbname(&config.database)
            .user(&config.username)
            .application_name("hoprun")
            .ssl_mode(tls_mode_to_ssl_mode(config.tls_mode));

        if let Some(password) = &config.password {
            pg_config.password(password);
        }
        if let Some(timeout) = config.session.connect_timeout {
            pg_config.connect_timeout(timeout);
        }
        if let Some(options) = session_options_string(&config.session) {
            pg_config.options(&options);
        }

        let (client, connection_task) = if config.tls_mode == TlsMode::Disable {
            let (client, connection) = pg_config
                .connect(NoTls)
                .await
                .map_err(|e| map_postgres_error("failed to connect to PostgreSQL", e))?;

            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        } else {
            let tls = PostgresTlsConnector::build(config.tls_mode)
                .map_err(|e| HoprunError::Connection(e.to_string()))?;
            let (client, connection) = pg_config
                .connect(tls)
                .await
                .map_err(|e| map_postgres_error("failed to connect to PostgreSQL", e))?;

            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        };

        tracing::info!(
            host = %config.host,
            port = %port,
            database = %config.database,
            "PostgreSQL connection established"
        );

        Ok(Self {
            client: Mutex::new(Some(client)),
            connection_task: SyncMutex::new(Some(connection_task)),
            closed: AtomicBool::new(false),
        })
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        if let Some(task) = self.connection_task.lock().take() {
            if !task.is_finished() {
                tracing::debug!("aborting PostgreSQL connection task on drop");
                task.abort();
            }
        }
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();

        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(HoprunError::Closed)?;

        let pg_params = params
            .iter()
            .map(PgParam::from_value)
            .collect::<Result<Vec<_>>>()?;

        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| map_postgres_error("failed to prepare query", e))?;

        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let pg_rows = client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| map_postgres_error("failed to execute query", e))?;

        // Column metadata comes from the statement so empty results still carry columns
        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(ordinal, col)| ColumnMeta {
                name: col.name().to_string(),
                data_type: col.type_().name().to_string(),
                ordinal,
            })
            .collect();
        let column_names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let values = (0..columns.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::new(Arc::clone(&column_names), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("closing PostgreSQL connection");

        drop(self.client.lock().await.take());

        let task = self.connection_task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                tracing::warn!("PostgreSQL connection task did not stop in time, aborting");
                task.abort();
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

/// Statement parameter, bound in text form.
///
/// Only catalog lookups bind parameters, and their targets are identifier
/// domains that the stock `String` encoding refuses.
#[derive(Debug, PartialEq)]
enum PgParam {
    Null,
    Text(String),
}

impl PgParam {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(PgParam::Null),
            Value::Text(v) => Ok(PgParam::Text(v.clone())),
            other => Err(HoprunError::NotSupported(format!(
                "{} parameters are not supported",
                other.type_name()
            ))),
        }
    }
}

impl ToSql for PgParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgParam::Null => Ok(postgres_types::IsNull::Yes),
            PgParam::Text(v) => v.as_str().to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// Exact decimal rendering of a binary NUMERIC payload
#[derive(Debug)]
struct PgNumericString(String);

/// Raw UTF-8 payload of a type we have no dedicated decoder for
#[derive(Debug)]
struct PgFallbackString(String);

impl PgNumericString {
    fn parse(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("invalid NUMERIC payload: too short".into());
        }

        let ndigits = i16::from_be_bytes([raw[0], raw[1]]);
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = i16::from_be_bytes([raw[6], raw[7]]);
        if ndigits < 0 || dscale < 0 {
            return Err("invalid NUMERIC payload: negative digit count or scale".into());
        }
        let (ndigits, dscale) = (ndigits as usize, dscale as usize);

        if raw.len() < 8 + ndigits * 2 {
            return Err("invalid NUMERIC payload: truncated digits".into());
        }

        match sign {
            0xC000 => return Ok("NaN".to_string()),
            0xD000 => return Ok("Infinity".to_string()),
            0xF000 => return Ok("-Infinity".to_string()),
            _ => {}
        }

        let mut digits = Vec::with_capacity(ndigits);
        for index in 0..ndigits {
            let offset = 8 + index * 2;
            let group = u16::from_be_bytes([raw[offset], raw[offset + 1]]);
            if group > 9999 {
                return Err("invalid NUMERIC payload: group out of range".into());
            }
            digits.push(group);
        }

        let integer_group_count = if weight >= 0 { weight as usize + 1 } else { 0 };

        let mut integer_text = String::new();
        if integer_group_count == 0 || digits.is_empty() {
            integer_text.push('0');
        } else {
            for group_index in 0..integer_group_count {
                let group = digits.get(group_index).copied().unwrap_or(0);
                if group_index == 0 {
                    integer_text.push_str(&group.to_string());
                } else {
                    integer_text.push_str(&format!("{group:04}"));
                }
            }
        }

        // Groups between the decimal point and the first stored fraction group
        let leading_zero_groups = if weight < -1 { (-weight - 1) as usize } else { 0 };

        let mut fraction_text = String::new();
        if dscale > 0 {
            fraction_text.push_str(&"0000".repeat(leading_zero_groups));
            let start = integer_group_count.min(digits.len());
            for group in digits.iter().skip(start) {
                fraction_text.push_str(&format!("{group:04}"));
            }

            if fraction_text.len() < dscale {
                fraction_text.push_str(&"0".repeat(dscale - fraction_text.len()));
            } else {
                fraction_text.truncate(dscale);
            }
        }

        let mut output = String::new();
        let is_zero = digits.iter().all(|group| *group == 0);
        if sign == 0x4000 && !is_zero {
            output.push('-');
        }
        output.push_str(&integer_text);
        if !fraction_text.is_empty() {
            output.push('.');
            output.push_str(&fraction_text);
        }

        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgNumericString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn decode<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| {
        let column = row.columns()[idx].name();
        HoprunError::Query(format!("failed to decode column \"{}\": {}", column, e))
    })
}

fn to_json_array<T: Into<serde_json::Value>>(items: Vec<Option<T>>) -> Value {
    Value::Json(serde_json::Value::Array(
        items
            .into_iter()
            .map(|item| item.map(Into::into).unwrap_or(serde_json::Value::Null))
            .collect(),
    ))
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Convert one column of a PostgreSQL row into a [`Value`]
fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let type_name = row.columns()[idx].type_().name();

    let value = match type_name {
        "bool" => decode::<bool>(row, idx)?.map(Value::Bool),
        "int2" => decode::<i16>(row, idx)?.map(|v| Value::Int(v.into())),
        "int4" => decode::<i32>(row, idx)?.map(|v| Value::Int(v.into())),
        "int8" => decode::<i64>(row, idx)?.map(Value::Int),
        "oid" => decode::<u32>(row, idx)?.map(|v| Value::Int(v.into())),
        "float4" => decode::<f32>(row, idx)?.map(|v| Value::Float(v.into())),
        "float8" => decode::<f64>(row, idx)?.map(Value::Float),
        "numeric" => decode::<PgNumericString>(row, idx)?.map(|v| Value::Text(v.0)),
        "text" | "varchar" | "bpchar" | "name" | "char" => {
            decode::<String>(row, idx)?.map(Value::Text)
        }
        "uuid" => decode::<uuid::Uuid>(row, idx)?.map(|v| Value::Text(v.to_string())),
        "json" | "jsonb" => decode::<serde_json::Value>(row, idx)?.map(Value::Json),
        "date" => decode::<chrono::NaiveDate>(row, idx)?.map(Value::Date),
        "time" => decode::<chrono::NaiveTime>(row, idx)?.map(|v| Value::Text(v.to_string())),
        "timestamp" => decode::<chrono::NaiveDateTime>(row, idx)?.map(Value::Timestamp),
        "timestamptz" => {
            decode::<chrono::DateTime<chrono::Utc>>(row, idx)?.map(Value::TimestampTz)
        }
        "bytea" => decode::<Vec<u8>>(row, idx)?.map(|v| Value::Text(hex_bytes(&v))),
        // Array types - PostgreSQL prefixes array type names with underscore
        "_text" | "_varchar" | "_bpchar" | "_name" => {
            decode::<Vec<Option<String>>>(row, idx)?.map(to_json_array)
        }
        "_bool" => decode::<Vec<Option<bool>>>(row, idx)?.map(to_json_array),
        "_int2" => decode::<Vec<Option<i16>>>(row, idx)?.map(to_json_array),
        "_int4" => decode::<Vec<Option<i32>>>(row, idx)?.map(to_json_array),
        "_int8" => decode::<Vec<Option<i64>>>(row, idx)?.map(to_json_array),
        "_float8" => decode::<Vec<Option<f64>>>(row, idx)?.map(to_json_array),
        _ => {
            // Custom types (e.g. enums) arrive as their UTF-8 text form
            match row.try_get::<_, Option<PgFallbackString>>(idx) {
                Ok(value) => value.map(|v| Value::Text(v.0)),
                Err(e) => {
                    tracing::warn!(
                        column = row.columns()[idx].name(),
                        pg_type = type_name,
                        error = %e,
                        "unsupported column type, returning null"
                    );
                    None
                }
            }
        }
    };

    Ok(value.unwrap_or(Value::Null))
}
