/*!
 * Provider implementations for different translation services.
 *
 * Every provider satisfies one contract: take a labeled batch plus the
 * translation instructions, return the raw generated text or a transport error.
 * Alignment checking is not a provider concern; see `translation::alignment`.
 *
 * - Gemini: Google Generative Language API
 * - OpenAI: OpenAI API and OpenAI-compatible servers (LM Studio)
 * - Anthropic: Anthropic Messages API
 * - Ollama: Local LLM server
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;

/// One generation request: instructions plus the labeled batch
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// System-level instructions (languages, line-count contract, label rule)
    pub instructions: String,

    /// The labeled lines, newline separated
    pub content: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling
    pub top_p: f32,
}

impl ProviderRequest {
    pub fn new(instructions: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            content: content.into(),
            temperature: 0.1,
            top_p: 0.9,
        }
    }

    pub fn sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Human readable provider name for logs
    fn name(&self) -> &str;

    /// Complete a request, returning the generated text
    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ProviderRequest::new("Reply with the single word OK.", "ping");
        self.complete(request).await.map(|_| ())
    }
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &TranslationConfig) -> Arc<dyn Provider> {
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let api_key = config.get_api_key();
    let timeout_secs = config.get_timeout_secs();

    match config.provider {
        TranslationProvider::Gemini => Arc::new(gemini::Gemini::new(api_key, endpoint, model, timeout_secs)),
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::new(endpoint, model, timeout_secs)),
        TranslationProvider::OpenAI => Arc::new(openai::OpenAI::new(api_key, endpoint, model, timeout_secs)),
        TranslationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = if api_key.is_empty() { "lm-studio".to_string() } else { api_key };
            Arc::new(openai::OpenAI::new(api_key, endpoint, model, timeout_secs).named("LM Studio"))
        }
        TranslationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(api_key, endpoint, model, timeout_secs))
        }
    }
}

/// HTTP client with the request timeout applied
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Map a failed send or body read into the provider error taxonomy
pub(crate) fn http_error(error: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::from(error)
    }
}

/// Turn a non-success HTTP status into an error carrying the response body
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    match status.as_u16() {
        401 | 403 => Err(ProviderError::AuthenticationError(message)),
        code => Err(ProviderError::ApiError { status_code: code, message }),
    }
}
