//! AI Completion - Provider trait and HTTP backends for text generation
//!
//! The translator only needs "send a prompt, get text back". Providers own
//! the wire format of their API and classify failures into
//! [`CompletionError`].

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default request timeout for provider calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request model for a single completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Creates a request with deterministic sampling.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response model for a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text, untrimmed
    pub text: String,
    /// Optional: tokens used for the request (for billing/tracking)
    pub tokens_used: Option<u32>,
}

/// Error type for AI completion operations.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(String),
    /// Authentication error (invalid API key, etc.)
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Rate limiting error
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// Non-success status other than 401/429
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The provider returned an invalid or empty response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,
    /// Provider not configured or unavailable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl CompletionError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Result type for AI completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// AI completion provider trait.
///
/// Implement this trait to add a new text-generation backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion. No retries, no streaming.
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse>;

    /// The provider's display name (e.g., "OpenAI")
    fn name(&self) -> &str;

    /// The model being used
    fn model(&self) -> &str;
}

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAi,
    Anthropic,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-3.5-turbo",
            AiProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => OPENAI_BASE_URL,
            AiProvider::Anthropic => ANTHROPIC_BASE_URL,
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(format!("unknown AI provider: {other}")),
        }
    }
}

/// Everything needed to build a provider
#[derive(Clone)]
pub struct ProviderSettings {
    pub provider: AiProvider,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(provider: AiProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn model_or_default(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    fn base_url_or_default(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

// Keep the API key out of logs.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Factory for creating AI completion providers from settings.
pub struct AiProviderFactory;

impl AiProviderFactory {
    /// Creates the configured provider.
    ///
    /// Fails with `ProviderUnavailable` when the API key is empty.
    pub fn create_provider(
        settings: &ProviderSettings,
    ) -> CompletionResult<Arc<dyn CompletionProvider>> {
        if settings.api_key.trim().is_empty() {
            return Err(CompletionError::ProviderUnavailable(format!(
                "no API key configured for {}",
                settings.provider
            )));
        }

        let client = build_client(settings.timeout)?;
        let provider: Arc<dyn CompletionProvider> = match settings.provider {
            AiProvider::OpenAi => Arc::new(OpenAiProvider {
                api_key: settings.api_key.clone(),
                model: settings.model_or_default(),
                base_url: settings.base_url_or_default(),
                client,
            }),
            AiProvider::Anthropic => Arc::new(AnthropicProvider {
                api_key: settings.api_key.clone(),
                model: settings.model_or_default(),
                base_url: settings.base_url_or_default(),
                client,
            }),
        };

        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "AI completion provider configured"
        );
        Ok(provider)
    }
}

fn build_client(timeout: Duration) -> CompletionResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CompletionError::ProviderUnavailable(format!("failed to create HTTP client: {e}")))
}

/// Classify a non-success status; passes successful responses through.
async fn check_status(response: Response, provider: &str) -> CompletionResult<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CompletionError::Authentication(
            format!("Invalid {provider} API key"),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(CompletionError::RateLimited(
            "Rate limit exceeded".to_string(),
        )),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            })
        }
        _ => Ok(response),
    }
}

/// OpenAI chat-completions provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        // The whole prompt goes in as one system message
        let body = OpenAiRequest {
            model: &self.model,
            messages: vec![OpenAiMessage {
                role: "system",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::from_reqwest)?;

        let response: OpenAiResponse = check_status(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let tokens_used = response.usage.map(|u| u.total_tokens);
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                CompletionError::InvalidResponse("No completion choices returned".to_string())
            })?;

        Ok(CompletionResponse { text, tokens_used })
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Anthropic messages provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::from_reqwest)?;

        let response: AnthropicResponse = check_status(response, "Anthropic")
            .await?
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let text: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.trim().is_empty() {
            return Err(CompletionError::InvalidResponse(
                "Empty completion returned".to_string(),
            ));
        }

        Ok(CompletionResponse {
            text,
            tokens_used: response.usage.map(|u| u.input_tokens + u.output_tokens),
        })
    }

    fn name(&self) -> &str {
        "Anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<AiProvider>(), Ok(AiProvider::OpenAi));
        assert_eq!(" anthropic ".parse::<AiProvider>(), Ok(AiProvider::Anthropic));
        assert!("local".parse::<AiProvider>().is_err());
    }

    #[test]
    fn settings_fill_provider_defaults() {
        let settings = ProviderSettings::new(AiProvider::OpenAi, "sk-test");
        assert_eq!(settings.model_or_default(), "gpt-3.5-turbo");
        assert_eq!(settings.base_url_or_default(), "https://api.openai.com");

        let settings = ProviderSettings::new(AiProvider::Anthropic, "key")
            .with_model("claude-x")
            .with_base_url("http://127.0.0.1:9999/");
        assert_eq!(settings.model_or_default(), "claude-x");
        assert_eq!(settings.base_url_or_default(), "http://127.0.0.1:9999");
    }

    #[test]
    fn settings_debug_hides_api_key() {
        let settings = ProviderSettings::new(AiProvider::OpenAi, "sk-very-secret");
        assert!(!format!("{settings:?}").contains("sk-very-secret"));
    }

    #[test]
    fn factory_requires_api_key() {
        let settings = ProviderSettings::new(AiProvider::OpenAi, "  ");
        let err = match AiProviderFactory::create_provider(&settings) {
            Ok(_) => panic!("expected missing key to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, CompletionError::ProviderUnavailable(_)));
    }

    #[test]
    fn factory_builds_configured_provider() {
        let settings = ProviderSettings::new(AiProvider::Anthropic, "key");
        let provider = AiProviderFactory::create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "Anthropic");
        assert_eq!(provider.model(), "claude-3-5-haiku-latest");
    }
}
