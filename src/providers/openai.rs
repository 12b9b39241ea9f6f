use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::retry::RetryPolicy;
use crate::providers::{CompletionRequest, Provider, http_client, status_error, transport_error};

/// Public OpenAI API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat completion APIs
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication (may be empty for local servers)
    api_key: String,
    /// API base URL, up to and including `/v1`
    endpoint: String,
    /// Retry behaviour for transient failures
    retry: RetryPolicy,
    /// Name used in logs and errors
    name: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: Option<String>,
}

/// Response format selector
#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionRequest {
    /// Map a completion request onto the chat completions wire format
    pub fn from_completion(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(request.system_message.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(request.prompt.clone()),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

impl OpenAI {
    /// Create a new client; an empty endpoint means the public API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint.trim_end_matches('/').to_string()
            },
            retry: RetryPolicy::default(),
            name: "OpenAI".to_string(),
        }
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the name used in logs (e.g. for LM Studio)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Chat completions URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    async fn send(&self, body: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        let mut builder = self.client.post(self.completions_url()).json(body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| transport_error(&self.name, e))?;
        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", self.name, e)))
    }

    /// Extract text from a chat completion response
    pub fn extract_text(response: &ChatCompletionResponse) -> Option<String> {
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest::from_completion(&request);
        let response = self.retry.execute(&self.name, || self.send(&body)).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "{} usage: {} prompt tokens, {} completion tokens",
                self.name, usage.prompt_tokens, usage.completion_tokens
            );
        }

        Self::extract_text(&response)
            .ok_or_else(|| ProviderError::EmptyResponse(format!("{} returned no message content", self.name)))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.endpoint);
        let mut builder = self.client.get(url);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| transport_error(&self.name, e))?;
        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
