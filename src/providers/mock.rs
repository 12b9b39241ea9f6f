/*!
 * Mock provider implementation for testing.
 *
 * `MockProvider` simulates different behaviors and records every request it
 * receives, in call order:
 * - `MockProvider::working()` - Always succeeds
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::empty()` - Succeeds with an empty text
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Requests seen so far, in arrival order
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
    /// Per-request artificial latency in milliseconds (optional)
    latency: Option<fn(&CompletionRequest) -> u64>,
    /// Fail any request whose prompt contains this text
    fail_on: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            latency: None,
            fail_on: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Delay each response by the number of milliseconds `latency` returns
    pub fn with_latency(mut self, latency: fn(&CompletionRequest) -> u64) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every request whose prompt contains `needle`
    pub fn fail_when_prompt_contains(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &CompletionRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[MOCK] {}", request.prompt),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(tokio::time::Duration::from_millis(latency(&request))).await;
        }

        if let Some(needle) = &self.fail_on {
            if request.prompt.contains(needle.as_str()) {
                return Err(ProviderError::ApiError {
                    message: format!("Simulated failure for prompt containing {:?}", needle),
                    status_code: 500,
                });
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
