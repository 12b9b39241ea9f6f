/*!
 * Chunked translation in three passes.
 *
 * Every pass runs one completion per chunk and finishes completely before the
 * next pass starts. Within a pass up to `concurrency` completions are in
 * flight; results always come back in chunk order.
 */

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};

use crate::errors::ProviderError;
use crate::providers::{CompletionSettings, Provider};
use crate::translation::chunking::TaggedText;
use crate::translation::prompts::{StagePrompt, TranslationPromptBuilder};

/// Runs translate → reflect → improve over a sequence of chunks
#[derive(Debug, Clone)]
pub struct MultiChunkTranslator {
    provider: Arc<dyn Provider>,
    settings: CompletionSettings,
    concurrency: usize,
}

impl MultiChunkTranslator {
    /// Translator that runs one completion at a time
    pub fn new(provider: Arc<dyn Provider>, settings: CompletionSettings) -> Self {
        Self {
            provider,
            settings,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` completions in flight within a pass
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn run_pass<F>(&self, stage: &str, chunk_count: usize, build: F) -> Result<Vec<String>, ProviderError>
    where
        F: Fn(usize) -> StagePrompt,
    {
        let started = Instant::now();
        let results: Vec<String> = stream::iter(0..chunk_count)
            .map(|index| {
                let prompt = build(index);
                self.provider
                    .complete(self.settings.request(prompt.system_message, prompt.prompt))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        debug!(
            "{} pass over {} chunks finished in {:?}",
            stage,
            chunk_count,
            started.elapsed()
        );
        Ok(results)
    }

    /// First draft of every chunk
    pub async fn initial_translations(
        &self,
        prompts: &TranslationPromptBuilder,
        tagged: &TaggedText<'_>,
    ) -> Result<Vec<String>, ProviderError> {
        self.run_pass("Initial translation", tagged.len(), |i| {
            prompts.chunk_initial_translation(&tagged.view(i), tagged.chunk(i))
        })
        .await
    }

    /// Expert suggestions for every chunk's draft
    pub async fn reflect_on_translations(
        &self,
        prompts: &TranslationPromptBuilder,
        tagged: &TaggedText<'_>,
        translation_1: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        self.run_pass("Reflection", tagged.len(), |i| {
            prompts.chunk_reflection(&tagged.view(i), tagged.chunk(i), &translation_1[i])
        })
        .await
    }

    /// Improved translation of every chunk
    pub async fn improve_translations(
        &self,
        prompts: &TranslationPromptBuilder,
        tagged: &TaggedText<'_>,
        translation_1: &[String],
        reflection: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        self.run_pass("Improvement", tagged.len(), |i| {
            prompts.chunk_improvement(
                &tagged.view(i),
                tagged.chunk(i),
                &translation_1[i],
                &reflection[i],
            )
        })
        .await
    }

    /// Translate every chunk and return the improved translations in chunk order
    pub async fn translate(
        &self,
        source_language: &str,
        target_language: &str,
        chunks: &[String],
        country: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let prompts = TranslationPromptBuilder::new(source_language, target_language).with_country(country);
        let tagged = TaggedText::new(chunks);

        info!("Pass 1/3: initial translation of {} chunks", tagged.len());
        let translation_1 = self.initial_translations(&prompts, &tagged).await?;

        info!("Pass 2/3: reflection");
        let reflection = self
            .reflect_on_translations(&prompts, &tagged, &translation_1)
            .await?;

        info!("Pass 3/3: improvement");
        self.improve_translations(&prompts, &tagged, &translation_1, &reflection)
            .await
    }
}
