/*!
 * Tests for application configuration functionality
 */

use reflective_translate::app_config::{Config, LogLevel, ProviderConfig, TranslationProvider};
use reflective_translate::translation::ChunkSizeUnit;

use crate::common;

/// Config whose active provider needs no API key
fn local_config() -> Config {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config
}

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "English");
    assert_eq!(config.target_language, "Spanish");
    assert_eq!(config.country, "");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.log_level, LogLevel::Info);

    assert_eq!(config.chunking.max_tokens_per_chunk, 1000);
    assert_eq!(config.chunking.encoding, "cl100k_base");
    assert_eq!(config.chunking.size_unit, ChunkSizeUnit::Tokens);

    let common = &config.translation.common;
    assert_eq!(common.temperature, 0.3);
    assert_eq!(common.max_output_tokens, 1000);
    assert_eq!(common.top_p, 1.0);
    assert_eq!(common.concurrent_requests, 1);

    assert_eq!(config.translation.available_providers.len(), 4);
}

/// Test per-provider defaults
#[test]
fn test_providerConfig_new_shouldUseProviderDefaults() {
    let openai = ProviderConfig::new(TranslationProvider::OpenAI);
    assert_eq!(openai.provider_type, "openai");
    assert_eq!(openai.model, "gpt-4-turbo");
    assert_eq!(openai.rate_limit, Some(60));

    let lmstudio = ProviderConfig::new(TranslationProvider::LMStudio);
    assert_eq!(lmstudio.endpoint, "http://localhost:1234/v1");
    assert_eq!(lmstudio.rate_limit, None);

    let ollama = ProviderConfig::new(TranslationProvider::Ollama);
    assert_eq!(ollama.model, "llama3");
}

/// Test provider name parsing
#[test]
fn test_translationProvider_fromStr_shouldParseCaseInsensitively() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("anthropic".parse::<TranslationProvider>().unwrap(), TranslationProvider::Anthropic);
    assert_eq!("LMSTUDIO".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("deepl".parse::<TranslationProvider>().is_err());

    assert_eq!(TranslationProvider::LMStudio.to_string(), "lmstudio");
    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
}

/// Test that a local provider validates without an API key
#[test]
fn test_validate_withLocalProvider_shouldPass() {
    assert!(local_config().validate().is_ok());
}

/// Test that hosted providers need a key
#[test]
fn test_validate_withHostedProviderAndNoKey_shouldFail() {
    let config = Config::default();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

/// Test rejection of invalid values
#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = local_config();
    config.target_language = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = local_config();
    config.chunking.max_tokens_per_chunk = 0;
    assert!(config.validate().is_err());

    let mut config = local_config();
    config.chunking.encoding = "gpt2-bytes".to_string();
    assert!(config.validate().is_err());

    let mut config = local_config();
    config.translation.common.temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = local_config();
    config.translation.common.top_p = 1.5;
    assert!(config.validate().is_err());
}

/// Test that keys are taken from the environment only when missing
#[test]
fn test_applyApiKeyOverrides_shouldFillOnlyEmptyKeys() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    if let Some(openai) = config
        .translation
        .available_providers
        .iter_mut()
        .find(|p| p.provider_type == "openai")
    {
        openai.api_key = "from-file".to_string();
    }

    config.apply_api_key_overrides(|name| match name {
        "OPENAI_API_KEY" => Some("from-env-openai".to_string()),
        "ANTHROPIC_API_KEY" => Some("from-env-anthropic".to_string()),
        _ => None,
    });

    assert_eq!(config.translation.get_api_key(), "from-env-anthropic");
    let openai = config
        .translation
        .get_provider_config(&TranslationProvider::OpenAI)
        .unwrap();
    assert_eq!(openai.api_key, "from-file");
    assert!(config.validate().is_ok());
}

/// Test that a missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.target_language, "Spanish");

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.translation.available_providers.len(), 4);
}

/// Test partial config files fall back to defaults
#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "target_language": "German",
            "country": "Austria",
            "translation": {
                "provider": "ollama",
                "available_providers": [
                    { "type": "ollama", "model": "mistral", "endpoint": "localhost:11434" }
                ]
            },
            "chunking": { "size_unit": "characters" }
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.source_language, "English");
    assert_eq!(config.target_language, "German");
    assert_eq!(config.country, "Austria");
    assert_eq!(config.translation.get_model(), "mistral");
    assert_eq!(config.translation.get_endpoint(), "localhost:11434");
    assert_eq!(config.translation.get_timeout_secs(), 120);
    assert_eq!(config.chunking.size_unit, ChunkSizeUnit::Characters);
    assert_eq!(config.chunking.max_tokens_per_chunk, 1000);
    assert!(config.validate().is_ok());
}

/// Test malformed config files are reported
#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    let err = Config::load_or_create(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

/// Test getters fall back to defaults when the active provider is not listed
#[test]
fn test_getters_withUnlistedProvider_shouldUseDefaults() {
    let mut config = Config::default();
    config.translation.available_providers.clear();
    config.translation.provider = TranslationProvider::Anthropic;

    assert_eq!(config.translation.get_model(), "claude-3-5-sonnet-latest");
    assert_eq!(config.translation.get_endpoint(), "https://api.anthropic.com");
    assert_eq!(config.translation.get_rate_limit(), Some(45));
    assert_eq!(config.translation.get_api_key(), "");
}
