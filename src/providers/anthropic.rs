use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::retry::RetryPolicy;
use crate::providers::{CompletionRequest, Provider, http_client, status_error, transport_error};

/// Public Anthropic API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    /// Model used by the connection test
    model: String,
    /// Retry behaviour for transient failures
    retry: RetryPolicy,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,

    /// Top probability mass to consider (nucleus sampling)
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    pub content: Vec<AnthropicContent>,
    /// Token usage information
    pub usage: TokenUsage,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
            top_p: None,
        }
    }

    /// Map a completion request onto the messages wire format
    ///
    /// The messages API has no JSON response switch, so JSON mode only adds an
    /// instruction to the system prompt.
    pub fn from_completion(request: &CompletionRequest) -> Self {
        let system = if request.json_mode {
            format!("{}\nRespond with a single valid JSON object.", request.system_message)
        } else {
            request.system_message.clone()
        };

        Self::new(&request.model, request.max_tokens)
            .system(system)
            .temperature(request.temperature)
            .top_p(request.top_p)
            .add_message("user", &request.prompt)
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the top_p (nucleus sampling)
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint.trim_end_matches('/').to_string()
            },
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Messages endpoint URL
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint)
    }

    /// Send a messages request once
    pub async fn send(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Anthropic", e))?;

        if !response.status().is_success() {
            return Err(status_error("Anthropic", response).await);
        }

        response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Anthropic: {}", e)))
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = AnthropicRequest::from_completion(&request);
        let response = self.retry.execute("Anthropic", || self.send(&body)).await?;

        debug!(
            "Anthropic usage: {} input tokens, {} output tokens",
            response.usage.input_tokens, response.usage.output_tokens
        );

        let text = Self::extract_text_from_response(&response);
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse("Anthropic returned no text content".to_string()));
        }
        Ok(text)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = AnthropicRequest::new(&self.model, 10).add_message("user", "Hello");
        self.send(&request).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}
