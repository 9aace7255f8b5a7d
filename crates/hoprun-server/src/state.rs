//! Service graph shared by all handlers

use anyhow::Context;
use hoprun_core::{DatabaseDriver, SessionOptions};
use hoprun_driver_postgres::PostgresDriver;
use hoprun_query::{
    AiProviderFactory, CompletionProvider, DefaultFormatter, InformationSchemaDescriber,
    LlmTranslator, RawQueryExecutor,
};
use hoprun_services::{AccountService, ConnectionService, ProjectService, QueryService, TokenSigner};
use hoprun_storage::{CredentialCipher, LocalStorage};
use std::sync::Arc;

use crate::ServerConfig;

/// State that's passed to all handlers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub projects: Arc<ProjectService>,
    pub connections: Arc<ConnectionService>,
    pub queries: Arc<QueryService>,
}

impl AppState {
    /// Wire the services around the given store and collaborators
    pub fn new(
        storage: LocalStorage,
        tokens: TokenSigner,
        cipher: Arc<CredentialCipher>,
        driver: Arc<dyn DatabaseDriver>,
        provider: Arc<dyn CompletionProvider>,
        session: SessionOptions,
    ) -> Self {
        let connections =
            Arc::new(ConnectionService::new(storage.clone(), cipher).with_session(session));
        let queries = QueryService::new(
            connections.clone(),
            driver,
            Arc::new(InformationSchemaDescriber::new()),
            Arc::new(LlmTranslator::new(provider)),
            Arc::new(RawQueryExecutor),
            Arc::new(DefaultFormatter),
        );

        Self {
            accounts: Arc::new(AccountService::new(storage.clone(), tokens)),
            projects: Arc::new(ProjectService::new(storage)),
            connections,
            queries: Arc::new(queries),
        }
    }

    /// Open storage and build the production service graph
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let tokens = TokenSigner::new(config.jwt_secret()?.as_bytes());
        let cipher = CredentialCipher::from_base64(config.encryption_key()?)
            .context("ENCRYPTION_KEY must be a base64-encoded 32-byte key")?;
        let provider = AiProviderFactory::create_provider(&config.provider_settings()?)
            .context("failed to create text-generation provider")?;
        let storage = LocalStorage::open(&config.database).with_context(|| {
            format!("failed to open storage at {}", config.database.display())
        })?;

        tracing::info!(
            database = %config.database.display(),
            provider = provider.name(),
            model = provider.model(),
            read_only = config.target.read_only,
            "service graph ready"
        );

        Ok(Self::new(
            storage,
            tokens,
            Arc::new(cipher),
            Arc::new(PostgresDriver::new()),
            provider,
            config.session_options(),
        ))
    }
}
