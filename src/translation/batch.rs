/*!
 * Batch planning.
 *
 * Flattened lines (one per subtitle block) are partitioned into consecutive
 * batches. Since every line is a whole block, a batch can never hold part of
 * a block.
 */

use log::debug;

/// An ordered run of flattened lines and the global position of its first line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based position of `lines[0]` in the whole document
    pub offset: usize,

    /// Flattened lines, one per block
    pub lines: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Global position one past the last line
    pub fn end(&self) -> usize {
        self.offset + self.lines.len()
    }
}

/// Split lines into batches of at most `max_batch_size` lines.
///
/// A size of zero is treated as one. Range clamping against configuration
/// bounds happens in `TranslationConfig::effective_batch_size`.
pub fn plan_batches(lines: &[String], max_batch_size: usize) -> Vec<Batch> {
    let size = max_batch_size.max(1);

    let batches: Vec<Batch> = lines
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            offset: i * size,
            lines: chunk.to_vec(),
        })
        .collect();

    debug!(
        "Planned {} batches for {} lines (max {} per batch)",
        batches.len(),
        lines.len(),
        size
    );
    batches
}
