//! Pipeline stage errors

use hoprun_core::HoprunError;
use thiserror::Error;

use crate::CompletionError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure of one pipeline stage, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema introspection failed: {0}")]
    Introspection(#[source] HoprunError),

    #[error("driver {driver} does not support schema introspection")]
    IntrospectionUnsupported { driver: String },

    #[error("translation failed: {0}")]
    Translation(#[from] CompletionError),

    #[error("execution failed: {0}")]
    Execution(#[source] HoprunError),
}
