/*!
 * Single-line representation of subtitle blocks.
 *
 * Each block travels through the alignment protocol as exactly one line, its
 * internal line breaks replaced by a sentinel token. Text that already contains
 * the sentinel does not round-trip; this is accepted rather than escaped.
 */

use crate::subtitle_processor::SubtitleEntry;

/// Placeholder substituted for a line break inside a block
pub const LINE_BREAK_SENTINEL: &str = "[[BR]]";

/// Join display lines into one line
pub fn flatten(lines: &[String]) -> String {
    lines.join(LINE_BREAK_SENTINEL)
}

/// Split a flattened line back into display lines
pub fn unflatten(flattened: &str) -> Vec<String> {
    flattened.split(LINE_BREAK_SENTINEL).map(str::to_string).collect()
}

/// Unflatten provider output, trimming each line and dropping blank ones
pub fn restore_lines(flattened: &str) -> Vec<String> {
    unflatten(flattened)
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// One flattened line per block, in document order
pub fn flatten_entries(entries: &[SubtitleEntry]) -> Vec<String> {
    entries.iter().map(|entry| flatten(&entry.lines)).collect()
}
