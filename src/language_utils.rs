//! Language utilities for ISO language code handling
//!
//! Languages reach the prompts as English names ("German", "Brazilian
//! Portuguese"). These helpers let callers pass ISO 639-1 or ISO 639-2 codes
//! instead and resolve them to names.

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"), // French
    ("ger", "deu"), // German
    ("dut", "nld"), // Dutch
    ("gre", "ell"), // Greek
    ("chi", "zho"), // Chinese
    ("cze", "ces"), // Czech
    ("ice", "isl"), // Icelandic
    ("alb", "sqi"), // Albanian
    ("arm", "hye"), // Armenian
    ("baq", "eus"), // Basque
    ("bur", "mya"), // Burmese
    ("per", "fas"), // Persian
    ("geo", "kat"), // Georgian
    ("may", "msa"), // Malay
    ("mac", "mkd"), // Macedonian
    ("rum", "ron"), // Romanian
    ("slo", "slk"), // Slovak
    ("wel", "cym"), // Welsh
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    // If it's a 2-letter code, convert to 3-letter
    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    }
    // If it's already a 3-letter code, ensure it's ISO 639-2/T
    else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }

        if let Some((_, part2t)) = PART2B_TO_PART2T.iter().find(|(b, _)| *b == normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Name to use for a language in prompts: the English name for an ISO code,
/// otherwise the input itself, trimmed.
pub fn display_language(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.len() <= 3 {
        if let Ok(name) = get_language_name(trimmed) {
            return name;
        }
    }
    trimmed.to_string()
}
