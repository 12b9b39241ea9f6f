/*!
 * Reflective translation of arbitrary text using AI providers.
 *
 * This module is split into several submodules:
 *
 * - `core`: the translation service, routing between single and multi pass
 * - `request`: the input of one translation call
 * - `chunking`: chunk size calculation, lossless splitting and tagged views
 * - `single_pass`: translate → reflect → improve over the whole text
 * - `multi_pass`: the same three stages as passes over all chunks
 * - `prompts`: prompt templates and builders for every stage
 */

// Re-export main types for easier usage
pub use self::core::{TranslationOptions, TranslationPlan, TranslationService};
pub use self::multi_pass::MultiChunkTranslator;
pub use self::request::TranslationRequest;
pub use self::single_pass::OneChunkTranslator;

// Re-export chunking types
pub use self::chunking::{
    ChunkSizeUnit, SemanticTextSplitter, TaggedText, TextSplitter, calculate_chunk_size, join_chunks,
};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod chunking;
pub mod core;
pub mod multi_pass;
pub mod prompts;
pub mod request;
pub mod single_pass;
