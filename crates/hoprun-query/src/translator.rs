//! Natural-language to SQL translation

use async_trait::async_trait;
use std::sync::Arc;

use crate::{CompletionError, CompletionProvider, CompletionRequest, CompletionResult};

/// Fence language tags dropped from the opening line of a fenced answer
const FENCE_LANGUAGES: &[&str] = &["sql", "postgresql", "postgres", "pgsql", "psql"];

/// Turns a question into one SQL statement for a described schema.
///
/// The returned SQL is untrusted model output; it is not validated here.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    async fn translate(&self, question: &str, schema: &str) -> CompletionResult<String>;
}

/// Build the single prompt sent to the provider
pub fn build_prompt(schema: &str, question: &str) -> String {
    format!(
        "You are a SQL expert. Given the following database schema:\n\n{schema}\n\n\
         Convert the following natural language query to SQL:\n{question}\n\n\
         Return only the SQL query without any markdown formatting, explanations, or additional text."
    )
}

/// Remove markdown code-fence artifacts and surrounding whitespace.
///
/// Handles ```` ```sql ```` and bare ```` ``` ```` openers and a closing
/// ```` ``` ````. Text without fences is only trimmed.
pub fn strip_code_fences(raw: &str) -> String {
    let mut sql = raw.trim();

    if let Some(rest) = sql.strip_prefix("```") {
        sql = strip_language_tag(rest);
    }
    if let Some(rest) = sql.strip_suffix("```") {
        sql = rest;
    }

    sql.trim().to_string()
}

fn strip_language_tag(after_fence: &str) -> &str {
    let tag_len = after_fence
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_fence.len());
    let (tag, rest) = after_fence.split_at(tag_len);

    let is_language = FENCE_LANGUAGES.iter().any(|l| tag.eq_ignore_ascii_case(l));
    if is_language && (rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        rest
    } else {
        after_fence
    }
}

/// Translator backed by a [`CompletionProvider`]
pub struct LlmTranslator {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: u32,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            max_tokens: 1024,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl SqlTranslator for LlmTranslator {
    #[tracing::instrument(skip_all, fields(provider = self.provider.name(), schema_len = schema.len()))]
    async fn translate(&self, question: &str, schema: &str) -> CompletionResult<String> {
        let request =
            CompletionRequest::new(build_prompt(schema, question)).with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        let sql = strip_code_fences(&response.text);
        if sql.is_empty() {
            return Err(CompletionError::InvalidResponse(
                "provider returned no SQL".to_string(),
            ));
        }

        tracing::debug!(
            tokens_used = response.tokens_used,
            sql_preview = %sql.chars().take(100).collect::<String>(),
            "question translated"
        );
        Ok(sql)
    }
}
