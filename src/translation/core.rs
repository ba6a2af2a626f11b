/*!
 * Core translation service implementation.
 *
 * `TranslationService` drives the pipeline for one document: flatten the blocks,
 * plan batches, send each batch through the alignment protocol strictly in
 * sequence, and recompose the translated text onto the original timings.
 */

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, TranslationConfig};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::{self, Provider};
use crate::status::{StatusEvent, StatusReporter};
use crate::subtitle_processor::SubtitleEntry;
use super::alignment::AlignmentProtocol;
use super::batch::plan_batches;
use super::flatten::flatten_entries;
use super::recompose::recompose_entries;
use super::retry::RetryPolicy;

/// Called after every successful batch with the blocks translated so far
pub type Checkpoint<'a> = &'a mut (dyn FnMut(&[SubtitleEntry]) -> Result<(), TranslationError> + Send);

/// Main translation service for subtitle translation
#[derive(Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Batch size, retries and sampling
    config: TranslationConfig,

    /// Source language code, or "auto"
    source_language: String,

    /// Target language code
    target_language: String,
}

impl TranslationService {
    /// Create the service with the provider selected in the configuration
    pub fn new(config: &Config) -> Self {
        let provider = providers::create_provider(&config.translation);
        Self::with_provider(provider, config)
    }

    /// Create the service around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, config: &Config) -> Self {
        Self {
            provider,
            config: config.translation.clone(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.common.max_attempts, self.config.retry_backoff())
    }

    /// Test the connection to the configured provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Translate blocks, returning them with the same indices and timings.
    ///
    /// Fails with `BatchFailure` as soon as one batch exhausts its attempts and
    /// with `Cancelled` once `cancel` fires; nothing is returned in either case.
    pub async fn translate_entries(
        &self,
        entries: &[SubtitleEntry],
        cancel: &CancellationToken,
        reporter: &dyn StatusReporter,
        mut checkpoint: Option<Checkpoint<'_>>,
    ) -> Result<Vec<SubtitleEntry>, TranslationError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        let flattened = flatten_entries(entries);
        let batches = plan_batches(&flattened, self.config.effective_batch_size());
        let protocol = AlignmentProtocol::new(
            self.provider.as_ref(),
            self.retry_policy(),
            language_utils::prompt_language_name(&self.source_language),
            language_utils::prompt_language_name(&self.target_language),
        )
        .with_sampling(self.config.common.temperature, self.config.common.top_p);

        info!(
            "Translating {} blocks in {} batches with {}",
            entries.len(), batches.len(), self.provider.name()
        );

        let mut translated: Vec<String> = Vec::with_capacity(entries.len());
        let mut total_attempts = 0;
        for (i, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }

            let aligned = protocol.translate_batch(batch, i + 1, cancel).await?;
            total_attempts += aligned.attempts;
            translated.extend(aligned.lines);

            // A result that raced with cancellation is discarded
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }

            reporter.report(&StatusEvent::Progress {
                completed: translated.len(),
                total: entries.len(),
            });

            if let Some(checkpoint) = checkpoint.as_mut() {
                let partial = recompose_entries(&entries[..translated.len()], &translated)?;
                checkpoint(&partial)?;
            }
        }

        debug!(
            "Translated {} blocks with {} provider calls in {:.1}s",
            entries.len(), total_attempts, start_time.elapsed().as_secs_f64()
        );
        recompose_entries(entries, &translated)
    }
}
