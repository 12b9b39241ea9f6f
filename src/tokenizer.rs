/*!
 * Token counting for chunk budgeting.
 *
 * Token counts decide whether a text is translated in one go or split into
 * chunks, so they must be reproducible: every count is taken with a fixed,
 * named tiktoken encoding.
 */

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tiktoken_rs::CoreBPE;

use crate::errors::TokenizerError;

/// Encoding used when none is configured
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Encodings this crate knows how to load
pub const SUPPORTED_ENCODINGS: &[&str] = &["cl100k_base", "o200k_base", "p50k_base", "p50k_edit", "r50k_base"];

/// Loaded encoders, shared across tokenizer instances
static ENCODERS: Lazy<RwLock<HashMap<String, Arc<CoreBPE>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Counts model tokens in a piece of text
pub trait Tokenizer: Send + Sync + Debug {
    /// Number of tokens in `text`
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;

    /// Name of the encoding used for counting
    fn encoding_name(&self) -> &str;
}

/// Tokenizer backed by a tiktoken byte-pair encoding
#[derive(Clone)]
pub struct TiktokenTokenizer {
    encoding: String,
    bpe: Arc<CoreBPE>,
}

impl Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl TiktokenTokenizer {
    /// Load the tokenizer for a named encoding
    pub fn for_encoding(encoding: &str) -> Result<Self, TokenizerError> {
        let bpe = load_encoder(encoding)?;
        Ok(Self {
            encoding: encoding.to_string(),
            bpe,
        })
    }

    /// Tokenizer for the default `cl100k_base` encoding
    pub fn cl100k() -> Result<Self, TokenizerError> {
        Self::for_encoding(DEFAULT_ENCODING)
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_ordinary(text).len())
    }

    fn encoding_name(&self) -> &str {
        &self.encoding
    }
}

/// Count the tokens of `text` with the named encoding
pub fn count_tokens(text: &str, encoding_name: &str) -> Result<usize, TokenizerError> {
    let bpe = load_encoder(encoding_name)?;
    Ok(bpe.encode_ordinary(text).len())
}

/// Whether `encoding` is one of the supported encodings
pub fn is_supported_encoding(encoding: &str) -> bool {
    SUPPORTED_ENCODINGS.contains(&encoding)
}

fn load_encoder(encoding: &str) -> Result<Arc<CoreBPE>, TokenizerError> {
    if let Some(bpe) = ENCODERS.read().get(encoding) {
        return Ok(Arc::clone(bpe));
    }

    let loaded = match encoding {
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "o200k_base" => tiktoken_rs::o200k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "p50k_edit" => tiktoken_rs::p50k_edit(),
        "r50k_base" => tiktoken_rs::r50k_base(),
        other => return Err(TokenizerError::UnsupportedEncoding(other.to_string())),
    };

    let bpe = Arc::new(loaded.map_err(|e| TokenizerError::Initialization {
        encoding: encoding.to_string(),
        message: e.to_string(),
    })?);

    debug!("Loaded token encoding {}", encoding);
    ENCODERS
        .write()
        .entry(encoding.to_string())
        .or_insert_with(|| Arc::clone(&bpe));

    Ok(bpe)
}
