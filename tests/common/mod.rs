/*!
 * Common test utilities for the reflective-translate test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use reflective_translate::errors::{SplitterError, TokenizerError};
use reflective_translate::providers::CompletionRequest;
use reflective_translate::providers::mock::MockProvider;
use reflective_translate::tokenizer::Tokenizer;
use reflective_translate::translation::{TextSplitter, TranslationOptions, TranslationService};

/// Route library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Tokenizer that reports the same count for every text
#[derive(Debug)]
pub struct FixedTokenizer {
    pub count: usize,
}

impl Tokenizer for FixedTokenizer {
    fn count_tokens(&self, _text: &str) -> Result<usize, TokenizerError> {
        Ok(self.count)
    }

    fn encoding_name(&self) -> &str {
        "fixed"
    }
}

/// Tokenizer whose every call fails
#[derive(Debug)]
pub struct BrokenTokenizer;

impl Tokenizer for BrokenTokenizer {
    fn count_tokens(&self, _text: &str) -> Result<usize, TokenizerError> {
        Err(TokenizerError::UnsupportedEncoding("broken".to_string()))
    }

    fn encoding_name(&self) -> &str {
        "broken"
    }
}

/// Splitter returning preset pieces and recording the arguments it was called with
#[derive(Debug, Default)]
pub struct RecordingSplitter {
    pieces: Vec<String>,
    fail: bool,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl RecordingSplitter {
    pub fn returning(pieces: &[&str]) -> Self {
        Self {
            pieces: pieces.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(target_size, overlap)` of every call, in order
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().clone()
    }
}

impl TextSplitter for RecordingSplitter {
    fn split(&self, _text: &str, target_size: usize, overlap: usize) -> Result<Vec<String>, SplitterError> {
        self.calls.lock().push((target_size, overlap));
        if self.fail {
            return Err(SplitterError::InvalidChunkSize(target_size));
        }
        Ok(self.pieces.clone())
    }
}

/// Which of the three stages a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initial,
    Reflection,
    Improvement,
}

pub fn stage_of(request: &CompletionRequest) -> Stage {
    if request.prompt.contains("<EXPERT_SUGGESTIONS>") {
        Stage::Improvement
    } else if request.prompt.contains("give constructive criticism") {
        Stage::Reflection
    } else {
        Stage::Initial
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str, last: bool) -> Option<&'a str> {
    let start = if last { text.rfind(open)? } else { text.find(open)? } + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

/// Text the prompt asks to translate: the repeated chunk block for chunked
/// prompts, the source block otherwise, or the whole prompt as a fallback
pub fn source_of(request: &CompletionRequest) -> &str {
    let prompt = request.prompt.as_str();
    between(prompt, "<TRANSLATE_THIS>\n", "\n</TRANSLATE_THIS>", true)
        .or_else(|| between(prompt, "<SOURCE_TEXT>\n", "\n</SOURCE_TEXT>", false))
        .unwrap_or(prompt)
}

/// Response labelled with its stage and the text it was asked about
pub fn stage_response(request: &CompletionRequest) -> String {
    let label = match stage_of(request) {
        Stage::Initial => "t1",
        Stage::Reflection => "notes",
        Stage::Improvement => "t2",
    };
    format!("{}[{}]", label, source_of(request))
}

/// Improvement returns the source unchanged, so a full run reproduces the input
pub fn identity_response(request: &CompletionRequest) -> String {
    match stage_of(request) {
        Stage::Initial => "draft".to_string(),
        Stage::Reflection => "no notes".to_string(),
        Stage::Improvement => source_of(request).to_string(),
    }
}

/// Build a service over a mock provider and test doubles
pub fn service_with(
    provider: &MockProvider,
    tokenizer: Arc<dyn Tokenizer>,
    splitter: Arc<dyn TextSplitter>,
    concurrent_requests: usize,
) -> TranslationService {
    init_test_logging();
    TranslationService::new(
        Arc::new(provider.clone()),
        tokenizer,
        splitter,
        TranslationOptions {
            concurrent_requests,
            ..TranslationOptions::default()
        },
    )
}
