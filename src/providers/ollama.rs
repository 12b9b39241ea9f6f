use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::retry::RetryPolicy;
use crate::providers::{CompletionRequest, Provider, http_client, status_error, transport_error};

/// Default local Ollama server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry behaviour for transient failures
    retry: RetryPolicy,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    /// Whether to stream the response
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    /// Map a completion request onto the chat wire format
    pub fn from_completion(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_message.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            options: Some(GenerationOptions {
                temperature: Some(request.temperature),
                top_p: Some(request.top_p),
                num_predict: Some(request.max_tokens),
            }),
            format: request.json_mode.then(|| "json".to_string()),
            stream: false,
        }
    }
}

impl Ollama {
    /// Create a new Ollama client from a base URL; empty means the local default
    pub fn from_url(url: impl Into<String>, timeout_secs: u64) -> Self {
        let url = url.into();
        let base_url = if url.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else if url.starts_with("http://") || url.starts_with("https://") {
            url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", url.trim_end_matches('/'))
        };

        Self {
            base_url,
            client: http_client(timeout_secs),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat request once
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !response.status().is_success() {
            return Err(status_error("Ollama", response).await);
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Ollama: failed to read response body: {}", e)))?;

        parse_chat_response(&response_text)
    }

    /// Get the Ollama server version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !response.status().is_success() {
            return Err(status_error("Ollama", response).await);
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Ollama version: {}", e)))?;

        value["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a chat response body.
///
/// Some servers stream JSON lines even when `stream` is false; in that case the
/// message fragments of every line are concatenated.
pub fn parse_chat_response(body: &str) -> Result<ChatResponse, ProviderError> {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(response) => Ok(response),
        Err(e) => {
            let preview: String = body.chars().take(500).collect();
            error!(
                "Failed to parse Ollama chat response: {}. Raw response (first 500 chars): {}",
                e, preview
            );

            let lines: Vec<ChatResponse> = body
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| serde_json::from_str::<ChatResponse>(line).ok())
                .collect();

            if lines.is_empty() {
                return Err(ProviderError::ParseError(format!("Ollama: {}", e)));
            }

            let content: String = lines.iter().map(|line| line.message.content.as_str()).collect();
            let last = &lines[lines.len() - 1];
            Ok(ChatResponse {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content,
                },
                done: true,
                prompt_eval_count: last.prompt_eval_count,
                eval_count: last.eval_count,
            })
        }
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatRequest::from_completion(&request);
        let response = self.retry.execute("Ollama", || self.chat(&body)).await?;

        debug!(
            "Ollama usage: {:?} prompt tokens, {:?} completion tokens",
            response.prompt_eval_count, response.eval_count
        );

        if response.message.content.is_empty() {
            return Err(ProviderError::EmptyResponse("Ollama returned an empty message".to_string()));
        }
        Ok(response.message.content)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
