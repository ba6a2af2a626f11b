/*!
 * Labeled-line alignment protocol.
 *
 * A batch is sent as lines `L000: text`, `L001: text`, ... and the provider must
 * answer with exactly as many labeled lines. Labels in the response are not
 * trusted: lines are taken in order of appearance. Any count mismatch or empty
 * payload fails the attempt, and the whole batch is retried uniformly.
 */

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::errors::TranslationError;
use crate::providers::{Provider, ProviderRequest};
use super::batch::Batch;
use super::flatten::LINE_BREAK_SENTINEL;
use super::retry::{retry_with_backoff, RetryError, RetryPolicy};

/// Minimum number of digits in a label
pub const LABEL_WIDTH: usize = 3;

static LABELED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(L\d+):\s*(.*?)\s*$").unwrap()
});

/// A flattened line tagged with its positional label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub label: String,
    pub text: String,
}

impl TranslationUnit {
    pub fn render(&self) -> String {
        format!("{}: {}", self.label, self.text)
    }
}

/// Outcome of a successfully aligned batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedBatch {
    /// One translated flattened line per input line
    pub lines: Vec<String>,

    /// Attempts it took, including the successful one
    pub attempts: u32,
}

/// Format the label for a zero-based position within a batch of `count` lines
pub fn format_label(position: usize, count: usize) -> String {
    let digits = count.saturating_sub(1).to_string().len();
    format!("L{:0width$}", position, width = digits.max(LABEL_WIDTH))
}

/// Tag each line with its label
pub fn label_units(lines: &[String]) -> Vec<TranslationUnit> {
    lines
        .iter()
        .enumerate()
        .map(|(i, text)| TranslationUnit {
            label: format_label(i, lines.len()),
            text: text.clone(),
        })
        .collect()
}

/// Render units as the request body, one per line
pub fn render_units(units: &[TranslationUnit]) -> String {
    units.iter().map(TranslationUnit::render).collect::<Vec<_>>().join("\n")
}

/// Split a labeled line into label and trimmed payload
pub fn split_label(line: &str) -> Option<(&str, &str)> {
    LABELED_LINE.captures(line).and_then(|caps| {
        let label = caps.get(1)?.as_str();
        let payload = caps.get(2).map_or("", |m| m.as_str());
        Some((label, payload))
    })
}

/// Instructions sent with every batch
pub fn build_instructions(source_language: &str, target_language: &str, count: usize) -> String {
    format!(
        "You are a professional subtitle translator. Translate each line from {source} to {target}.\n\
         \n\
         Rules:\n\
         - The input has exactly {count} lines. Each line starts with a label such as {first}:\n\
         - Return exactly {count} lines, one translated line per input line, in the same order.\n\
         - Begin every returned line with the same label as the input line, followed by a colon and a space.\n\
         - Keep the token {sentinel} exactly where it appears; it marks a line break inside the subtitle.\n\
         - Keep formatting tags such as <i>, </i> and {{\\an8}} unchanged.\n\
         - Do not merge, split, skip or add lines. Do not add notes, explanations or code fences.\n\
         - Never leave a line empty; translate interjections and names as-is if needed.",
        source = source_language,
        target = target_language,
        count = count,
        first = format_label(0, count),
        sentinel = LINE_BREAK_SENTINEL,
    )
}

/// Payloads of all labeled lines in order of appearance
pub fn extract_labeled_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(split_label)
        .map(|(_, payload)| payload.to_string())
        .collect()
}

/// Check a raw response against the expected line count
pub fn validate_response(raw: &str, expected: usize) -> Result<Vec<String>, TranslationError> {
    let lines = extract_labeled_lines(raw);
    if lines.len() != expected {
        return Err(TranslationError::AlignmentMismatch { expected, found: lines.len() });
    }
    if let Some(position) = lines.iter().position(|line| line.trim().is_empty()) {
        return Err(TranslationError::EmptyPayload { position });
    }
    Ok(lines)
}

/// Sends batches through a provider and enforces the alignment contract
pub struct AlignmentProtocol<'a> {
    provider: &'a dyn Provider,
    policy: RetryPolicy,
    source_language: String,
    target_language: String,
    temperature: f32,
    top_p: f32,
}

impl<'a> AlignmentProtocol<'a> {
    /// Languages are display names as they should appear in the instructions
    pub fn new(
        provider: &'a dyn Provider,
        policy: RetryPolicy,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            source_language: source_language.into(),
            target_language: target_language.into(),
            temperature: 0.1,
            top_p: 0.9,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    /// The request sent for a batch; identical on every attempt
    pub fn request_for(&self, batch: &Batch) -> ProviderRequest {
        let units = label_units(&batch.lines);
        ProviderRequest::new(
            build_instructions(&self.source_language, &self.target_language, batch.len()),
            render_units(&units),
        )
        .sampling(self.temperature, self.top_p)
    }

    /// Translate one batch, retrying until the response aligns.
    ///
    /// `batch_number` is 1-based and only used for reporting.
    pub async fn translate_batch(
        &self,
        batch: &Batch,
        batch_number: usize,
        cancel: &CancellationToken,
    ) -> Result<AlignedBatch, TranslationError> {
        let expected = batch.len();
        let request = self.request_for(batch);

        let result = retry_with_backoff(&self.policy, cancel, |attempt| {
            let request = request.clone();
            async move {
                debug!(
                    "Batch {} attempt {}: sending {} lines to {}",
                    batch_number, attempt, expected, self.provider.name()
                );
                let raw = tokio::select! {
                    _ = cancel.cancelled() => return Err(TranslationError::Cancelled),
                    response = self.provider.complete(request) => response?,
                };
                validate_response(&raw, expected)
            }
        })
        .await;

        match result {
            Ok((lines, attempts)) => {
                if attempts > 1 {
                    info!("Batch {} aligned after {} attempts", batch_number, attempts);
                }
                Ok(AlignedBatch { lines, attempts })
            }
            Err(RetryError::Cancelled) => Err(TranslationError::Cancelled),
            Err(RetryError::Exhausted { attempts, last_error }) => Err(TranslationError::BatchFailure {
                batch: batch_number,
                offset: batch.offset,
                attempts,
                last_error: last_error.to_string(),
            }),
        }
    }
}
