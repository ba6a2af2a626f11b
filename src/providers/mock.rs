/*!
 * Mock provider implementations for testing.
 *
 * The mock reads the labeled batch it is given and answers in the same
 * labeled format, optionally breaking the alignment contract on purpose:
 * - `MockProvider::echo()` - returns every payload unchanged
 * - `MockProvider::reverse_case()` - swaps letter case, keeps line break tokens
 * - `MockProvider::mismatch_first(n)` - drops a line for the first n requests
 * - `MockProvider::always_mismatch()` - never returns the right line count
 * - `MockProvider::failing()` - always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest};
use crate::translation::alignment::split_label;
use crate::translation::flatten::LINE_BREAK_SENTINEL;

/// Per-line transformation applied to each payload segment
pub type LineTransform = fn(&str) -> String;

/// Behavior mode for the mock provider
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always answers with every line transformed
    Translate(LineTransform),
    /// Omits the last line for the first `failures` requests, then translates
    MismatchFirst { failures: usize, transform: LineTransform },
    /// Always omits the last line
    AlwaysMismatch,
    /// Returns the scripted responses in order; the last one repeats
    Scripted(Vec<String>),
    /// Always fails with an error
    Failing,
    /// Translates after sleeping (for cancellation testing)
    Slow { delay_ms: u64, transform: LineTransform },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

/// Return the text unchanged
pub fn echo(text: &str) -> String {
    text.to_string()
}

/// Swap the case of every letter
pub fn reverse_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<String>()
            } else if c.is_lowercase() {
                c.to_uppercase().collect::<String>()
            } else {
                c.to_string()
            }
        })
        .collect()
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Translate(echo))
    }

    pub fn reverse_case() -> Self {
        Self::new(MockBehavior::Translate(reverse_case))
    }

    pub fn mismatch_first(failures: usize) -> Self {
        Self::new(MockBehavior::MismatchFirst { failures, transform: echo })
    }

    pub fn always_mismatch() -> Self {
        Self::new(MockBehavior::AlwaysMismatch)
    }

    pub fn scripted(responses: Vec<String>) -> Self {
        Self::new(MockBehavior::Scripted(responses))
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms, transform: echo })
    }

    /// Number of `complete` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the requests received
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    /// Answer a labeled batch line by line, transforming each sentinel-separated segment
    pub fn answer(content: &str, transform: LineTransform) -> Vec<String> {
        content
            .lines()
            .filter_map(split_label)
            .map(|(label, payload)| {
                let translated: Vec<String> = payload.split(LINE_BREAK_SENTINEL).map(transform).collect();
                format!("{}: {}", label, translated.join(LINE_BREAK_SENTINEL))
            })
            .collect()
    }

    fn without_last(mut lines: Vec<String>) -> String {
        lines.pop();
        lines.join("\n")
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match &self.behavior {
            MockBehavior::Translate(transform) => Ok(Self::answer(&request.content, *transform).join("\n")),

            MockBehavior::MismatchFirst { failures, transform } => {
                let lines = Self::answer(&request.content, *transform);
                if count < *failures {
                    Ok(Self::without_last(lines))
                } else {
                    Ok(lines.join("\n"))
                }
            }

            MockBehavior::AlwaysMismatch => Ok(Self::without_last(Self::answer(&request.content, echo))),

            MockBehavior::Scripted(responses) => responses
                .get(count)
                .or_else(|| responses.last())
                .cloned()
                .ok_or_else(|| ProviderError::RequestFailed("No scripted response".to_string())),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Slow { delay_ms, transform } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::answer(&request.content, *transform).join("\n"))
            }
        }
    }
}
