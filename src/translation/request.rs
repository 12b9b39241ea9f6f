/*!
 * Translation requests: languages, source text, optional country and chunk budget.
 *
 * Requests are built directly or parsed from the four-line prompt format and
 * validated before any completion is made.
 */

use crate::errors::TranslationError;

/// Token budget per chunk when none is given
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 1000;

/// Input of one translation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub source_text: String,
    /// Empty means no regional style preference
    pub country: String,
    pub max_tokens_per_chunk: usize,
}

impl TranslationRequest {
    /// Request with no country and the default chunk budget
    pub fn new(
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            source_text: source_text.into(),
            country: String::new(),
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_max_tokens_per_chunk(mut self, max_tokens_per_chunk: usize) -> Self {
        self.max_tokens_per_chunk = max_tokens_per_chunk;
        self
    }

    /// Parse a four-line prompt: source language, target language, country
    /// (may be blank) and then the text, which runs to the end of the input.
    pub fn from_prompt(prompt: &str, max_tokens_per_chunk: usize) -> Result<Self, TranslationError> {
        let mut lines = prompt.splitn(4, '\n');
        let mut next_line = |what: &str| {
            lines
                .next()
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .ok_or_else(|| TranslationError::InvalidRequest(format!("prompt is missing the {} line", what)))
        };

        let source_language = next_line("source language")?.trim().to_string();
        let target_language = next_line("target language")?.trim().to_string();
        let country = next_line("country")?.trim().to_string();
        let source_text = next_line("text")?.to_string();

        Self {
            source_language,
            target_language,
            source_text,
            country,
            max_tokens_per_chunk,
        }
        .validated()
    }

    /// Reject requests no translation can be run for
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.max_tokens_per_chunk == 0 {
            return Err(TranslationError::InvalidRequest(
                "max_tokens_per_chunk must be greater than zero".to_string(),
            ));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(TranslationError::InvalidRequest(
                "source and target language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validated(self) -> Result<Self, TranslationError> {
        self.validate()?;
        Ok(self)
    }
}
