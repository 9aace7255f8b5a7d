//! Hoprun Query - The stages of the natural-language query pipeline
//!
//! This crate provides each stage behind a narrow trait so the orchestrator
//! can be assembled from real or test implementations:
//!
//! - [`SchemaDescriber`] - renders a live schema as prompt text
//! - [`SqlTranslator`] - turns a question plus schema into SQL via a completion provider
//! - [`QueryExecutor`] - runs SQL on an open handle
//! - [`ResultFormatter`] - shapes rows for a visualization hint

pub mod ai_completion;
mod error;
mod executor;
mod formatter;
mod introspector;
mod translator;

pub use ai_completion::{
    AiProvider, AiProviderFactory, CompletionError, CompletionProvider, CompletionRequest,
    CompletionResponse, CompletionResult, ProviderSettings,
};
pub use error::{PipelineError, PipelineResult};
pub use executor::{QueryExecutor, RawQueryExecutor};
pub use formatter::{DefaultFormatter, FormattedResult, ResultFormatter, Visualization};
pub use introspector::{InformationSchemaDescriber, SchemaDescriber, render_schema};
pub use translator::{LlmTranslator, SqlTranslator, build_prompt, strip_code_fences};
