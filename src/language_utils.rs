use anyhow::{Result, anyhow};
use isolang::Language;
use std::path::Path;

// Language utilities for ISO language code handling
//
// Codes are accepted as ISO 639-1 (2-letter), ISO 639-2/T or ISO 639-2/B
// (3-letter). Subtitle file names are checked against all three forms and
// the English language name.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Marker accepted as a source language meaning "let the provider detect it"
pub const AUTO_DETECT: &str = "auto";

fn terminology_code(bibliographic: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES.iter()
        .find(|(b, _)| *b == bibliographic)
        .map(|(_, t)| *t)
}

fn bibliographic_code(terminology: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES.iter()
        .find(|(_, t)| *t == terminology)
        .map(|(b, _)| *b)
}

/// Whether the code asks for source language auto-detection
pub fn is_auto_detect(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(AUTO_DETECT)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some(part2t) = terminology_code(&normalized_code) {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
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

/// Language name suitable for a translation instruction.
///
/// Unknown codes are passed through unchanged so a free-form name such as
/// "Brazilian Portuguese" still reaches the provider.
pub fn prompt_language_name(code: &str) -> String {
    if is_auto_detect(code) {
        return "the source language (detect it automatically)".to_string();
    }
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Every spelling of a language that may appear as a file name tag
fn language_tags(code: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let Ok(part2t) = normalize_to_part2t(code) else {
        tags.push(code.trim().to_lowercase());
        return tags;
    };

    if let Some(lang) = Language::from_639_3(&part2t) {
        if let Some(part1) = lang.to_639_1() {
            tags.push(part1.to_string());
        }
        tags.push(lang.to_name().to_lowercase());
    }
    if let Some(part2b) = bibliographic_code(&part2t) {
        tags.push(part2b.to_string());
    }
    tags.push(part2t);
    tags
}

/// Whether a subtitle file name already carries the given language tag.
///
/// The file stem is split on `.`, `_`, `-` and spaces, so `movie.ro.srt`,
/// `movie_RO.srt` and `Movie - Romanian.srt` all match "ro".
pub fn filename_indicates_language<P: AsRef<Path>>(path: P, code: &str) -> bool {
    let Some(stem) = path.as_ref().file_stem() else {
        return false;
    };
    let stem = stem.to_string_lossy().to_lowercase();
    let tags = language_tags(code);

    stem.split(['.', '_', '-', ' '])
        .filter(|part| !part.is_empty())
        .any(|part| tags.iter().any(|tag| tag == part))
}
