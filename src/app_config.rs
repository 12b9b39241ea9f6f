use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;

use crate::tokenizer;
use crate::translation::chunking::ChunkSizeUnit;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (name or ISO code)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language (name or ISO code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Country whose colloquial style the translation should match; empty means none
    #[serde(default)]
    pub country: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Chunking config
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Environment variable that may hold this provider's API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama | Self::LMStudio => None,
        }
    }

    /// Whether the provider is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        self.api_key_env_var().is_some()
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_secs(),
            rate_limit: default_rate_limit(&provider_type),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per completion
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Completions in flight at once within one multi-chunk pass
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            top_p: default_top_p(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// How source text is measured and split
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Token budget above which the text is split
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,

    /// Token encoding used for counting
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Unit the splitter measures chunk sizes in
    #[serde(default)]
    pub size_unit: ChunkSizeUnit,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            encoding: default_encoding(),
            size_unit: ChunkSizeUnit::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Spanish".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_top_p() -> f32 {
    1.0
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_max_tokens_per_chunk() -> usize {
    1000
}

fn default_encoding() -> String {
    tokenizer::DEFAULT_ENCODING.to_string()
}

fn default_model(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => crate::providers::DEFAULT_MODEL.to_string(),
        TranslationProvider::Anthropic => "claude-3-5-sonnet-latest".to_string(),
        TranslationProvider::Ollama => "llama3".to_string(),
        // Placeholder; users should set to the loaded model name in LM Studio
        TranslationProvider::LMStudio => "local-model".to_string(),
    }
}

fn default_endpoint(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::OpenAI => crate::providers::openai::DEFAULT_ENDPOINT.to_string(),
        TranslationProvider::Anthropic => crate::providers::anthropic::DEFAULT_ENDPOINT.to_string(),
        TranslationProvider::Ollama => crate::providers::ollama::DEFAULT_ENDPOINT.to_string(),
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        TranslationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_rate_limit(provider: &TranslationProvider) -> Option<u32> {
    match provider {
        TranslationProvider::OpenAI => Some(60),
        // Slightly below Anthropic's standard 50 requests per minute
        TranslationProvider::Anthropic => Some(45),
        TranslationProvider::Ollama | TranslationProvider::LMStudio => None,
    }
}

impl Config {
    /// Load the configuration from `path`, writing a default file first if none exists
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Fill empty API keys from the environment.
    ///
    /// `lookup` resolves a variable name, normally `|name| std::env::var(name).ok()`.
    pub fn apply_api_key_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for provider_config in &mut self.translation.available_providers {
            if !provider_config.api_key.is_empty() {
                continue;
            }
            let Ok(provider) = provider_config.provider_type.parse::<TranslationProvider>() else {
                continue;
            };
            if let Some(key) = provider.api_key_env_var().and_then(&lookup) {
                if !key.is_empty() {
                    provider_config.api_key = key;
                }
            }
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language must not be empty"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }

        if self.chunking.max_tokens_per_chunk == 0 {
            return Err(anyhow!("max_tokens_per_chunk must be greater than zero"));
        }
        if !tokenizer::is_supported_encoding(&self.chunking.encoding) {
            return Err(anyhow!(
                "Unsupported token encoding: {} (supported: {})",
                self.chunking.encoding,
                tokenizer::SUPPORTED_ENCODINGS.join(", ")
            ));
        }

        let common = &self.translation.common;
        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", common.temperature));
        }
        if !(0.0..=1.0).contains(&common.top_p) {
            return Err(anyhow!("top_p must be between 0.0 and 1.0, got {}", common.top_p));
        }
        if common.max_output_tokens == 0 {
            return Err(anyhow!("max_output_tokens must be greater than zero"));
        }

        // Hosted providers need a key; local servers do not
        let provider = &self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set it in the config file or {})",
                provider.display_name(),
                provider.api_key_env_var().unwrap_or_default()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            country: String::new(),
            translation: TranslationConfig::default(),
            chunking: ChunkingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable configuration for the active provider, created with defaults if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.model.is_empty() => provider_config.model.clone(),
            _ => default_model(&self.provider),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(provider_config) if !provider_config.endpoint.is_empty() => provider_config.endpoint.clone(),
            _ => default_endpoint(&self.provider),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) if provider_config.timeout_secs > 0 => provider_config.timeout_secs,
            _ => default_timeout_secs(),
        }
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit,
            None => default_rate_limit(&self.provider),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
