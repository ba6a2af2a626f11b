/*!
 * Translation pipeline for subtitle documents.
 *
 * This module contains the alignment-preserving translation pipeline. It is
 * split into several submodules, leaf first:
 *
 * - `flatten`: one line per block, line breaks replaced by a sentinel
 * - `batch`: partitioning of flattened lines into bounded batches
 * - `retry`: generic retrying call wrapper with abortable backoff
 * - `alignment`: labeled-line protocol and response validation
 * - `recompose`: translated lines back onto original indices and timings
 * - `core`: service definition driving the whole pipeline
 */

// Re-export main types for easier usage
pub use self::alignment::{AlignedBatch, AlignmentProtocol, TranslationUnit};
pub use self::batch::{plan_batches, Batch};
pub use self::core::TranslationService;
pub use self::flatten::{flatten, unflatten, LINE_BREAK_SENTINEL};
pub use self::recompose::{recompose_document, recompose_entries};
pub use self::retry::{retry_with_backoff, RetryError, RetryPolicy};

// Submodules
pub mod alignment;
pub mod batch;
pub mod core;
pub mod flatten;
pub mod recompose;
pub mod retry;
