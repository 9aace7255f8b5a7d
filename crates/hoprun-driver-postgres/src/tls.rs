//! PostgreSQL TLS Support
//!
//! Builds `native-tls` connectors for tokio-postgres from a [`TlsMode`].

use hoprun_core::TlsMode;
use native_tls::TlsConnector as NativeTlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tracing::debug;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),

    /// TLS mode not supported
    #[error("TLS mode {mode:?} is not supported for this operation")]
    UnsupportedMode { mode: TlsMode },
}

/// A PostgreSQL TLS connector builder
#[derive(Debug, Clone)]
pub struct PostgresTlsConnector;

impl PostgresTlsConnector {
    /// Build a TLS connector for the given mode.
    ///
    /// `Disable` has no connector; callers use `NoTls` instead. `Prefer` and
    /// `Require` encrypt without verifying the server certificate, matching
    /// libpq's behavior for those modes.
    pub fn build(mode: TlsMode) -> Result<MakeTlsConnector, TlsError> {
        if mode == TlsMode::Disable {
            return Err(TlsError::UnsupportedMode { mode });
        }

        debug!(mode = %mode, "building PostgreSQL TLS connector");

        let connector = NativeTlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

        Ok(MakeTlsConnector::new(connector))
    }

    /// Check if TLS is disabled for the given mode
    pub fn is_disabled(mode: TlsMode) -> bool {
        mode == TlsMode::Disable
    }
}

/// Map a [`TlsMode`] to the tokio-postgres SSL mode
pub(crate) fn tls_mode_to_ssl_mode(mode: TlsMode) -> tokio_postgres::config::SslMode {
    match mode {
        TlsMode::Disable => tokio_postgres::config::SslMode::Disable,
        TlsMode::Prefer => tokio_postgres::config::SslMode::Prefer,
        TlsMode::Require => tokio_postgres::config::SslMode::Require,
    }
}
