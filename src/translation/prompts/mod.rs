/*!
 * Prompts for the translate → reflect → improve workflow.
 *
 * This module provides:
 * - Literal templates for every stage, whole-text and per-chunk
 * - Single-pass placeholder rendering
 * - Detection of delimiter tags already present in source text
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, StagePrompt, TranslationPromptBuilder, find_reserved_tags};
