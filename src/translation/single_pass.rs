/*!
 * Whole-text translation in three dependent completions.
 */

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::errors::ProviderError;
use crate::providers::{CompletionSettings, Provider};
use crate::translation::prompts::{StagePrompt, TranslationPromptBuilder};

/// Runs translate → reflect → improve over a text that fits one completion
#[derive(Debug, Clone)]
pub struct OneChunkTranslator {
    provider: Arc<dyn Provider>,
    settings: CompletionSettings,
}

impl OneChunkTranslator {
    pub fn new(provider: Arc<dyn Provider>, settings: CompletionSettings) -> Self {
        Self { provider, settings }
    }

    async fn complete(&self, stage: &str, prompt: StagePrompt) -> Result<String, ProviderError> {
        let started = Instant::now();
        let result = self
            .provider
            .complete(self.settings.request(prompt.system_message, prompt.prompt))
            .await;
        debug!("{} finished in {:?}", stage, started.elapsed());
        result
    }

    /// First draft of the translation
    pub async fn initial_translation(
        &self,
        prompts: &TranslationPromptBuilder,
        source_text: &str,
    ) -> Result<String, ProviderError> {
        self.complete("Initial translation", prompts.initial_translation(source_text))
            .await
    }

    /// Expert suggestions for improving `translation_1`
    pub async fn reflect_on_translation(
        &self,
        prompts: &TranslationPromptBuilder,
        source_text: &str,
        translation_1: &str,
    ) -> Result<String, ProviderError> {
        self.complete("Reflection", prompts.reflection(source_text, translation_1))
            .await
    }

    /// Revised translation that takes `reflection` into account
    pub async fn improve_translation(
        &self,
        prompts: &TranslationPromptBuilder,
        source_text: &str,
        translation_1: &str,
        reflection: &str,
    ) -> Result<String, ProviderError> {
        self.complete(
            "Improvement",
            prompts.improvement(source_text, translation_1, reflection),
        )
        .await
    }

    /// Translate `source_text` and return the improved translation verbatim
    pub async fn translate(
        &self,
        source_language: &str,
        target_language: &str,
        source_text: &str,
        country: &str,
    ) -> Result<String, ProviderError> {
        let prompts = TranslationPromptBuilder::new(source_language, target_language).with_country(country);

        let translation_1 = self.initial_translation(&prompts, source_text).await?;
        let reflection = self
            .reflect_on_translation(&prompts, source_text, &translation_1)
            .await?;
        self.improve_translation(&prompts, source_text, &translation_1, &reflection)
            .await
    }
}
