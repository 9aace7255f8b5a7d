use hoprun_query::PipelineError;
use hoprun_storage::StorageError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level errors, classified for callers.
///
/// The payload is internal detail for logs. Callers only ever see
/// [`ServiceError::code`] and [`ServiceError::public_message`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    #[error("Malformed request: {0}")]
    DecodeFailure(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Limit reached: {0}")]
    LimitReached(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::UpstreamUnavailable(_) => "upstream_unavailable",
            ServiceError::ExecutionFailure(_) => "execution_failure",
            ServiceError::DecodeFailure(_) => "decode_failure",
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::LimitReached(_) => "limit_reached",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// HTTP status for the error
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::UpstreamUnavailable(_) => 502,
            ServiceError::ExecutionFailure(_) => 422,
            ServiceError::DecodeFailure(_) | ServiceError::Validation(_) => 400,
            ServiceError::Conflict(_) | ServiceError::LimitReached(_) => 409,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Message safe to show to callers.
    ///
    /// Validation messages are written by this crate from request fields and
    /// are passed through; everything else is a fixed string.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(message) => message.clone(),
            ServiceError::NotFound(_) => "resource not found".to_string(),
            ServiceError::UpstreamUnavailable(_) => {
                "an upstream service is unavailable".to_string()
            }
            ServiceError::ExecutionFailure(_) => "the generated query failed to execute".to_string(),
            ServiceError::DecodeFailure(_) => "request body could not be decoded".to_string(),
            ServiceError::Conflict(_) => "resource already exists".to_string(),
            ServiceError::LimitReached(_) => "project already has a database connection".to_string(),
            ServiceError::Unauthorized(_) => "invalid or missing credentials".to_string(),
            ServiceError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict(what) => ServiceError::Conflict(what),
            StorageError::NotFound(what) => ServiceError::NotFound(what),
            StorageError::LimitReached { project_id } => {
                ServiceError::LimitReached(format!("project {project_id}"))
            }
            other => {
                tracing::error!(error = %other, "storage failure");
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<PipelineError> for ServiceError {
    fn from(error: PipelineError) -> Self {
        match &error {
            PipelineError::Execution(inner) if inner.is_query_error() => {
                tracing::warn!(error = %error, "generated statement failed");
                ServiceError::ExecutionFailure(error.to_string())
            }
            _ => {
                tracing::warn!(error = %error, "query pipeline stage unavailable");
                ServiceError::UpstreamUnavailable(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoprun_core::HoprunError;
    use hoprun_query::CompletionError;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn status_codes_follow_taxonomy() {
        let cases = [
            (ServiceError::NotFound(String::new()), 404, "not_found"),
            (ServiceError::UpstreamUnavailable(String::new()), 502, "upstream_unavailable"),
            (ServiceError::ExecutionFailure(String::new()), 422, "execution_failure"),
            (ServiceError::DecodeFailure(String::new()), 400, "decode_failure"),
            (ServiceError::Validation(String::new()), 400, "validation"),
            (ServiceError::Conflict(String::new()), 409, "conflict"),
            (ServiceError::LimitReached(String::new()), 409, "limit_reached"),
            (ServiceError::Unauthorized(String::new()), 401, "unauthorized"),
            (ServiceError::Internal(String::new()), 500, "internal"),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn public_message_hides_internal_detail() {
        let error = ServiceError::from(PipelineError::Execution(HoprunError::Query(
            "relation \"secret_table\" does not exist".into(),
        )));
        assert_eq!(error.code(), "execution_failure");
        assert!(!error.public_message().contains("secret_table"));

        let error = ServiceError::Internal("disk I/O error at /var/lib/hoprun.db".into());
        assert!(!error.public_message().contains("/var/lib"));
    }

    #[test]
    fn pipeline_errors_classify_by_stage() {
        let translation: ServiceError =
            PipelineError::Translation(CompletionError::Timeout).into();
        assert_eq!(translation.code(), "upstream_unavailable");

        let lost: ServiceError = PipelineError::Execution(HoprunError::Closed).into();
        assert_eq!(lost.code(), "upstream_unavailable");

        let catalog: ServiceError =
            PipelineError::Introspection(HoprunError::Query("permission denied".into())).into();
        assert_eq!(catalog.code(), "upstream_unavailable");
    }

    #[test]
    fn storage_errors_keep_their_kind() {
        let limit: ServiceError = StorageError::LimitReached {
            project_id: Uuid::nil(),
        }
        .into();
        assert_eq!(limit.code(), "limit_reached");

        let conflict: ServiceError = StorageError::Conflict("user".into()).into();
        assert_eq!(conflict.code(), "conflict");

        let internal: ServiceError = StorageError::Task("panicked".into()).into();
        assert_eq!(internal.code(), "internal");
    }
}
