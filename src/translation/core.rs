/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, which decides
 * between a whole-text and a chunked translation and turns every failure
 * along the way into a single `TranslationError`.
 */

use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::app_config::{Config, TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::{ProviderError, TranslationError, TranslationFailure};
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::retry::RetryPolicy;
use crate::providers::{CompletionSettings, Provider};
use crate::tokenizer::{TiktokenTokenizer, Tokenizer};
use crate::translation::chunking::{SemanticTextSplitter, TextSplitter, calculate_chunk_size, join_chunks};
use crate::translation::multi_pass::MultiChunkTranslator;
use crate::translation::prompts::find_reserved_tags;
use crate::translation::request::{DEFAULT_MAX_TOKENS_PER_CHUNK, TranslationRequest};
use crate::translation::single_pass::OneChunkTranslator;

/// Parse an endpoint string, adding `http://` when no scheme is given
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }

    Ok(url)
}

/// Build the completion client for the active provider
pub fn provider_from_config(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let endpoint = config.get_endpoint();
    let url = parse_endpoint(&endpoint).with_context(|| format!("Invalid {} endpoint", config.provider.display_name()))?;
    let endpoint = url.as_str().trim_end_matches('/').to_string();

    let timeout_secs = config.get_timeout_secs();
    let retry = RetryPolicy::new(config.common.retry_count, config.common.retry_backoff_ms)
        .with_rate_limit(config.get_rate_limit());

    let provider: Arc<dyn Provider> = match config.provider {
        ConfigTranslationProvider::OpenAI => {
            Arc::new(OpenAI::new(config.get_api_key(), endpoint, timeout_secs).with_retry(retry))
        }
        ConfigTranslationProvider::LMStudio => Arc::new(
            OpenAI::new(config.get_api_key(), endpoint, timeout_secs)
                .with_retry(retry)
                .with_name("LM Studio"),
        ),
        ConfigTranslationProvider::Anthropic => Arc::new(
            Anthropic::new(config.get_api_key(), endpoint, config.get_model(), timeout_secs).with_retry(retry),
        ),
        ConfigTranslationProvider::Ollama => Arc::new(Ollama::from_url(endpoint, timeout_secs).with_retry(retry)),
    };

    Ok(provider)
}

/// Translation options for customizing the translation process
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    /// Model and sampling settings for every completion
    pub settings: CompletionSettings,

    /// Maximum number of concurrent requests within a pass
    pub concurrent_requests: usize,

    /// Chunk budget used by `translate_text`
    pub max_tokens_per_chunk: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            settings: CompletionSettings::default(),
            concurrent_requests: 1,
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
        }
    }
}

/// How a request will be translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationPlan {
    /// The text fits one completion
    SinglePass {
        token_count: usize,
    },
    /// The text is split into chunks of about `chunk_size` units
    MultiPass {
        token_count: usize,
        chunk_size: usize,
        chunks: Vec<String>,
    },
}

/// Main translation service
#[derive(Debug, Clone)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    tokenizer: Arc<dyn Tokenizer>,
    splitter: Arc<dyn TextSplitter>,
    options: TranslationOptions,
}

impl TranslationService {
    /// Create a translation service from its collaborators
    pub fn new(
        provider: Arc<dyn Provider>,
        tokenizer: Arc<dyn Tokenizer>,
        splitter: Arc<dyn TextSplitter>,
        options: TranslationOptions,
    ) -> Self {
        Self {
            provider,
            tokenizer,
            splitter,
            options,
        }
    }

    /// Create a new translation service with the given configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = provider_from_config(&config.translation)?;
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(
            TiktokenTokenizer::for_encoding(&config.chunking.encoding).context("Failed to load tokenizer")?,
        );
        let splitter: Arc<dyn TextSplitter> = Arc::new(SemanticTextSplitter::for_unit(
            config.chunking.size_unit,
            Arc::clone(&tokenizer),
        ));

        let common = &config.translation.common;
        let options = TranslationOptions {
            settings: CompletionSettings {
                model: config.translation.get_model(),
                temperature: common.temperature,
                max_tokens: common.max_output_tokens,
                top_p: common.top_p,
            },
            concurrent_requests: common.concurrent_requests.max(1),
            max_tokens_per_chunk: config.chunking.max_tokens_per_chunk,
        };

        Ok(Self::new(provider, tokenizer, splitter, options))
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    /// Name of the completion provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Count tokens and, for oversized texts, split them into chunks
    pub fn plan(&self, request: &TranslationRequest) -> Result<TranslationPlan, TranslationFailure> {
        let token_count = self.tokenizer.count_tokens(&request.source_text)?;

        if token_count <= request.max_tokens_per_chunk {
            return Ok(TranslationPlan::SinglePass { token_count });
        }

        let chunk_size = calculate_chunk_size(token_count, request.max_tokens_per_chunk);
        let chunks = self.splitter.split(&request.source_text, chunk_size, 0)?;
        Ok(TranslationPlan::MultiPass {
            token_count,
            chunk_size,
            chunks,
        })
    }

    async fn run(&self, request: &TranslationRequest) -> Result<String, TranslationFailure> {
        match self.plan(request)? {
            TranslationPlan::SinglePass { token_count } => {
                info!("Translating {} tokens in a single pass", token_count);
                let translator = OneChunkTranslator::new(Arc::clone(&self.provider), self.options.settings.clone());
                Ok(translator
                    .translate(
                        &request.source_language,
                        &request.target_language,
                        &request.source_text,
                        &request.country,
                    )
                    .await?)
            }
            TranslationPlan::MultiPass {
                token_count,
                chunk_size,
                chunks,
            } => {
                info!(
                    "Translating {} tokens in {} chunks (target size {})",
                    token_count,
                    chunks.len(),
                    chunk_size
                );
                let translator = MultiChunkTranslator::new(Arc::clone(&self.provider), self.options.settings.clone())
                    .with_concurrency(self.options.concurrent_requests);
                let translations = translator
                    .translate(&request.source_language, &request.target_language, &chunks, &request.country)
                    .await?;
                Ok(join_chunks(&translations))
            }
        }
    }

    /// Translate a request.
    ///
    /// Any tokenizer, splitter or provider failure is returned as
    /// `TranslationError::Failed` with the cause as its source; no partial
    /// result is ever returned.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        request.validate()?;

        let reserved = find_reserved_tags(&request.source_text);
        if !reserved.is_empty() {
            warn!(
                "Source text contains prompt delimiter tags ({}); the model may misread the prompt",
                reserved.join(", ")
            );
        }

        let started = Instant::now();
        match self.run(request).await {
            Ok(translation) => {
                info!(
                    "Translation from {} to {} finished in {:?}",
                    request.source_language,
                    request.target_language,
                    started.elapsed()
                );
                Ok(translation)
            }
            Err(failure) => {
                error!("Translation failed: {}", failure);
                Err(TranslationError::Failed(failure))
            }
        }
    }

    /// Translate `text` with the configured chunk budget
    pub async fn translate_text(
        &self,
        source_language: &str,
        target_language: &str,
        text: &str,
        country: &str,
    ) -> Result<String, TranslationError> {
        let request = TranslationRequest::new(source_language, target_language, text)
            .with_country(country)
            .with_max_tokens_per_chunk(self.options.max_tokens_per_chunk);
        self.translate(&request).await
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        info!("Testing connection to {}", self.provider.name());
        self.provider.test_connection().await
    }
}
