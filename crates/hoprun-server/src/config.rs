//! Server configuration
//!
//! Settings come from three layers, highest precedence first: command-line
//! arguments (each also readable from an environment variable), an optional
//! JSON config file, then built-in defaults.

use anyhow::Context;
use clap::Parser;
use hoprun_core::SessionOptions;
use hoprun_query::{AiProvider, ProviderSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LoggingConfig;

/// Command-line arguments
#[derive(Parser, Default)]
#[command(name = "hoprun", version, about = "Ask questions about your PostgreSQL databases in plain language")]
pub struct Cli {
    /// JSON config file
    #[arg(long, env = "HOPRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOPRUN_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Path of the SQLite application store
    #[arg(long, env = "HOPRUN_DATABASE")]
    pub database: Option<PathBuf>,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Base64 AES-256 key for stored connection passwords
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Text-generation provider (openai, anthropic)
    #[arg(long, env = "HOPRUN_AI_PROVIDER")]
    pub ai_provider: Option<AiProvider>,

    /// Text-generation API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    /// Model name, defaults per provider
    #[arg(long, env = "HOPRUN_AI_MODEL")]
    pub ai_model: Option<String>,

    /// Override the provider's base URL
    #[arg(long)]
    pub ai_base_url: Option<String>,

    /// Provider request timeout in seconds
    #[arg(long)]
    pub ai_timeout_secs: Option<u64>,

    /// Server-side statement timeout for target queries
    #[arg(long)]
    pub statement_timeout_ms: Option<u64>,

    /// Open target sessions read-only
    #[arg(long)]
    pub read_only: bool,

    /// Write JSON logs to a daily-rolling file
    #[arg(long)]
    pub log_json: bool,

    /// Directory for JSON log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// Text-generation provider settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Session settings for target databases
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub statement_timeout_ms: Option<u64>,
    pub read_only: bool,
    pub connect_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            statement_timeout_ms: None,
            read_only: false,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub json: bool,
    pub dir: Option<PathBuf>,
}

/// Fully merged server configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub database: PathBuf,
    pub jwt_secret: Option<String>,
    pub encryption_key: Option<String>,
    pub ai: AiConfig,
    pub target: TargetConfig,
    pub logging: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: default_database_path(),
            jwt_secret: None,
            encryption_key: None,
            ai: AiConfig::default(),
            target: TargetConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Merge the config file named by `cli` (if any) with `cli` itself
    pub fn load(cli: Cli) -> anyhow::Result<Self> {
        let base = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.merge(cli))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Apply command-line values over this configuration
    pub fn merge(mut self, cli: Cli) -> Self {
        if let Some(listen) = cli.listen {
            self.listen = listen;
        }
        if let Some(database) = cli.database {
            self.database = database;
        }
        if cli.jwt_secret.is_some() {
            self.jwt_secret = cli.jwt_secret;
        }
        if cli.encryption_key.is_some() {
            self.encryption_key = cli.encryption_key;
        }
        if let Some(provider) = cli.ai_provider {
            self.ai.provider = provider;
        }
        if cli.ai_api_key.is_some() {
            self.ai.api_key = cli.ai_api_key;
        }
        if cli.ai_model.is_some() {
            self.ai.model = cli.ai_model;
        }
        if cli.ai_base_url.is_some() {
            self.ai.base_url = cli.ai_base_url;
        }
        if let Some(secs) = cli.ai_timeout_secs {
            self.ai.timeout_secs = secs;
        }
        if cli.statement_timeout_ms.is_some() {
            self.target.statement_timeout_ms = cli.statement_timeout_ms;
        }
        self.target.read_only |= cli.read_only;
        self.logging.json |= cli.log_json;
        if cli.log_dir.is_some() {
            self.logging.dir = cli.log_dir;
        }
        self
    }

    pub fn jwt_secret(&self) -> anyhow::Result<&str> {
        required(&self.jwt_secret, "JWT_SECRET (--jwt-secret)")
    }

    pub fn encryption_key(&self) -> anyhow::Result<&str> {
        required(&self.encryption_key, "ENCRYPTION_KEY (--encryption-key)")
    }

    pub fn provider_settings(&self) -> anyhow::Result<ProviderSettings> {
        let api_key = required(&self.ai.api_key, "OPENAI_API_KEY (--ai-api-key)")?;
        let mut settings = ProviderSettings::new(self.ai.provider, api_key)
            .with_timeout(Duration::from_secs(self.ai.timeout_secs));
        if let Some(model) = &self.ai.model {
            settings = settings.with_model(model);
        }
        if let Some(base_url) = &self.ai.base_url {
            settings = settings.with_base_url(base_url);
        }
        Ok(settings)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            statement_timeout: self.target.statement_timeout_ms.map(Duration::from_millis),
            read_only: self.target.read_only,
            connect_timeout: Some(Duration::from_secs(self.target.connect_timeout_secs)),
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let mut config = if self.logging.json {
            LoggingConfig {
                enable_console_logs: true,
                ..LoggingConfig::production()
            }
        } else {
            LoggingConfig::development()
        };
        if let Some(dir) = &self.logging.dir {
            config.log_dir = dir.clone();
        }
        config
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("missing required setting {name}"),
    }
}

/// `<data dir>/hoprun/hoprun.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hoprun")
        .join("hoprun.db")
}
