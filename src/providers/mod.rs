/*!
 * Provider implementations for the completion boundary.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI: OpenAI chat completions (also LM Studio's compatible server)
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Mock: scriptable in-process provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// One chat completion call: a system message plus a single user prompt
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System message framing the model's role
    pub system_message: String,
    /// User prompt
    pub prompt: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Nucleus sampling mass
    pub top_p: f32,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

/// Sampling settings shared by every call of one translation
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1000,
            top_p: 1.0,
        }
    }
}

impl CompletionSettings {
    /// Build a plain-text request with these settings
    pub fn request(&self, system_message: impl Into<String>, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            system_message: system_message.into(),
            prompt: prompt.into(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            json_mode: false,
        }
    }
}

impl CompletionRequest {
    /// Request a JSON object response
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request and return the generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Complete `request` in JSON mode and parse the answer
pub async fn complete_json(
    provider: &dyn Provider,
    request: CompletionRequest,
) -> Result<serde_json::Value, ProviderError> {
    let text = provider.complete(request.json()).await?;
    serde_json::from_str(text.trim()).map_err(|e| ProviderError::JsonMode(e.to_string()))
}

/// HTTP client with the given request timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Turn a reqwest transport error into a provider error
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(format!("{}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Read a non-success response body into a classified provider error
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, body);
    ProviderError::from_status(status, body)
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod retry;
