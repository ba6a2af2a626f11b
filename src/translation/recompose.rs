/*!
 * Rebuild subtitle blocks from translated flattened lines.
 *
 * Index and timing come from the source block; only the text changes.
 */

use log::warn;

use crate::errors::TranslationError;
use crate::subtitle_processor::{render_srt, SubtitleEntry};
use super::flatten::restore_lines;

/// Pair each source block with its translated line, in order.
///
/// A translated line that restores to nothing drops its block with a warning;
/// the alignment protocol rejects empty payloads, so this only happens when a
/// payload consisted of nothing but line break tokens.
pub fn recompose_entries(
    entries: &[SubtitleEntry],
    translated: &[String],
) -> Result<Vec<SubtitleEntry>, TranslationError> {
    if entries.len() != translated.len() {
        return Err(TranslationError::AlignmentMismatch {
            expected: entries.len(),
            found: translated.len(),
        });
    }

    let mut blocks = Vec::with_capacity(entries.len());
    for (entry, line) in entries.iter().zip(translated) {
        let lines = restore_lines(line);
        if lines.is_empty() {
            warn!("Dropping block {}: translation restored to no text", entry.index);
            continue;
        }
        blocks.push(entry.with_lines(lines));
    }
    Ok(blocks)
}

/// Recompose and render the translated document
pub fn recompose_document(entries: &[SubtitleEntry], translated: &[String]) -> Result<String, TranslationError> {
    Ok(render_srt(&recompose_entries(entries, translated)?))
}
