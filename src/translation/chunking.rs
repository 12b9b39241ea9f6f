/*!
 * Chunking of source texts that exceed one completion's token budget.
 *
 * - `calculate_chunk_size`: target size for a split, from a token count and a limit
 * - `TextSplitter` / `SemanticTextSplitter`: lossless partition of a text
 * - `TaggedText`: full-text view with one chunk marked for translation
 */

use std::fmt::Debug;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use text_splitter::{Characters, ChunkConfig, ChunkSizer as SemanticSizer, TextSplitter as SemanticSplitter};

use crate::errors::SplitterError;
use crate::tokenizer::Tokenizer;

/// Opening marker around the chunk being worked on
pub const TRANSLATE_THIS_OPEN: &str = "<TRANSLATE_THIS>";

/// Closing marker around the chunk being worked on
pub const TRANSLATE_THIS_CLOSE: &str = "</TRANSLATE_THIS>";

/// Compute the target chunk size for splitting a text of `token_count` tokens
/// into pieces no larger than `token_limit`.
///
/// When the text already fits, the token count is returned unchanged. Otherwise
/// the text is divided into `ceil(token_count / token_limit)` chunks and the
/// per-chunk share of the remainder `token_count % token_limit` is added on top,
/// which keeps the splitter from emitting a tiny trailing chunk.
///
/// Both arguments must be greater than zero.
pub fn calculate_chunk_size(token_count: usize, token_limit: usize) -> usize {
    if token_count <= token_limit {
        return token_count;
    }

    let num_chunks = token_count.div_ceil(token_limit);
    let mut chunk_size = token_count / num_chunks;

    let remaining_tokens = token_count % token_limit;
    if remaining_tokens > 0 {
        chunk_size += remaining_tokens / num_chunks;
    }

    chunk_size
}

/// Concatenate translated chunks back into one text, in order, with no separator
pub fn join_chunks(chunks: &[String]) -> String {
    chunks.concat()
}

/// Unit in which a splitter measures chunk sizes
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSizeUnit {
    /// Model tokens, counted with the configured tokenizer
    #[default]
    Tokens,
    /// Unicode scalar values
    Characters,
}

/// Splits a text into an ordered sequence of contiguous pieces.
///
/// Implementations must be lossless: concatenating the returned pieces in
/// order yields the input text exactly.
pub trait TextSplitter: Send + Sync + Debug {
    /// Split `text` into pieces of at most `target_size` units
    fn split(&self, text: &str, target_size: usize, overlap: usize) -> Result<Vec<String>, SplitterError>;
}

/// Measures the size of a piece of text
#[derive(Debug, Clone)]
pub enum ChunkSizer {
    /// Count characters
    Characters,
    /// Count tokens
    Tokens(Arc<dyn Tokenizer>),
}

impl ChunkSizer {
    /// Size of `text` in this sizer's unit
    pub fn size(&self, text: &str) -> Result<usize, SplitterError> {
        match self {
            Self::Characters => Ok(Characters.size(text)),
            Self::Tokens(tokenizer) => Ok(tokenizer.count_tokens(text)?),
        }
    }
}

/// Bridges a fallible `ChunkSizer` to the splitter crate, which expects an
/// infallible size. The first error lands in `error` and is reported once the
/// split is done.
struct MeasuringSizer {
    sizer: ChunkSizer,
    error: Arc<Mutex<Option<SplitterError>>>,
}

impl SemanticSizer for MeasuringSizer {
    fn size(&self, chunk: &str) -> usize {
        match self.sizer.size(chunk) {
            Ok(size) => size,
            Err(e) => {
                self.error.lock().get_or_insert(e);
                0
            }
        }
    }
}

/// Splitter that cuts at the coarsest semantic boundary that fits (line
/// breaks, sentences, words, graphemes, characters) using the `text-splitter`
/// crate.
///
/// Trimming is disabled and chunks are cut at the crate's chunk offsets, so no
/// input text is ever dropped.
#[derive(Debug, Clone)]
pub struct SemanticTextSplitter {
    sizer: ChunkSizer,
}

impl SemanticTextSplitter {
    pub fn new(sizer: ChunkSizer) -> Self {
        Self { sizer }
    }

    /// Splitter measuring sizes in characters
    pub fn by_characters() -> Self {
        Self::new(ChunkSizer::Characters)
    }

    /// Splitter measuring sizes in tokens
    pub fn by_tokens(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self::new(ChunkSizer::Tokens(tokenizer))
    }

    /// Splitter for a configured size unit
    pub fn for_unit(unit: ChunkSizeUnit, tokenizer: Arc<dyn Tokenizer>) -> Self {
        match unit {
            ChunkSizeUnit::Tokens => Self::by_tokens(tokenizer),
            ChunkSizeUnit::Characters => Self::by_characters(),
        }
    }
}

impl TextSplitter for SemanticTextSplitter {
    fn split(&self, text: &str, target_size: usize, overlap: usize) -> Result<Vec<String>, SplitterError> {
        if target_size == 0 {
            return Err(SplitterError::InvalidChunkSize(target_size));
        }
        if overlap >= target_size {
            return Err(SplitterError::InvalidOverlap {
                overlap,
                chunk_size: target_size,
            });
        }
        if overlap > 0 {
            return Err(SplitterError::OverlapUnsupported(overlap));
        }
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let error = Arc::new(Mutex::new(None));
        let sizer = MeasuringSizer {
            sizer: self.sizer.clone(),
            error: Arc::clone(&error),
        };
        let splitter = SemanticSplitter::new(ChunkConfig::new(target_size).with_trim(false).with_sizer(sizer));

        // Cut at chunk start offsets so the pieces always tile the input
        let mut starts: Vec<usize> = splitter.chunk_indices(text).map(|(offset, _)| offset).collect();
        if let Some(e) = error.lock().take() {
            return Err(e);
        }
        if starts.first() != Some(&0) {
            starts.insert(0, 0);
        }

        let ends = starts.iter().skip(1).copied().chain(std::iter::once(text.len()));
        let chunks: Vec<String> = starts
            .iter()
            .zip(ends)
            .filter(|(start, end)| **start < *end)
            .map(|(start, end)| text[*start..end].to_string())
            .collect();

        debug!("Split {} bytes into {} chunks (target {})", text.len(), chunks.len(), target_size);
        Ok(chunks)
    }
}

/// The complete source text with one chunk at a time wrapped in
/// `<TRANSLATE_THIS>` markers.
///
/// The chunks are joined once up front; each view is then built from two
/// slices of the joined text around the marked chunk.
#[derive(Debug, Clone)]
pub struct TaggedText<'a> {
    chunks: &'a [String],
    joined: String,
    offsets: Vec<usize>,
}

impl<'a> TaggedText<'a> {
    /// Prepare tagged views over `chunks`
    pub fn new(chunks: &'a [String]) -> Self {
        let mut joined = String::with_capacity(chunks.iter().map(String::len).sum());
        let mut offsets = Vec::with_capacity(chunks.len() + 1);
        offsets.push(0);
        for chunk in chunks {
            joined.push_str(chunk);
            offsets.push(joined.len());
        }

        Self { chunks, joined, offsets }
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether there are no chunks at all
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The untagged chunk at `index`
    pub fn chunk(&self, index: usize) -> &'a str {
        &self.chunks[index]
    }

    /// Full text with chunk `index` wrapped in markers.
    ///
    /// Panics if `index` is out of range.
    pub fn view(&self, index: usize) -> String {
        let before = &self.joined[..self.offsets[index]];
        let after = &self.joined[self.offsets[index + 1]..];
        let chunk = &self.chunks[index];

        let mut view = String::with_capacity(
            self.joined.len() + TRANSLATE_THIS_OPEN.len() + TRANSLATE_THIS_CLOSE.len(),
        );
        view.push_str(before);
        view.push_str(TRANSLATE_THIS_OPEN);
        view.push_str(chunk);
        view.push_str(TRANSLATE_THIS_CLOSE);
        view.push_str(after);
        view
    }
}
