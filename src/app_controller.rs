use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, WriteMode};
use crate::errors::{AppError, SubtitleError, TranslationError};
use crate::file_utils::FileManager;
use crate::status::{LogReporter, StatusEvent, StatusReporter};
use crate::subtitle_processor::{render_srt, SubtitleCollection, SubtitleEntry};
use crate::translation::core::Checkpoint;
use crate::translation::TranslationService;

// @module: Application controller for subtitle processing

/// Result of one run for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The translated document was written to this path
    Translated(PathBuf),
    /// An output already existed; no provider call was made
    AlreadyTranslated(PathBuf),
    /// Playback stopped or the service is shutting down
    Cancelled,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Translation pipeline
    service: TranslationService,

    // @field: Where start, progress and results are reported
    reporter: Arc<dyn StatusReporter>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        let service = TranslationService::new(&config);
        Self::with_service(config, service, Arc::new(LogReporter))
    }

    /// Create a controller around an existing service and status surface
    pub fn with_service(config: Config, service: TranslationService, reporter: Arc<dyn StatusReporter>) -> Self {
        Self { config, service, reporter }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Where the translation of `source` is written.
    ///
    /// The configured output directory is used when it exists, otherwise the
    /// file lands next to its source.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let output_dir = match &self.config.watcher.output_dir {
            Some(dir) if FileManager::dir_exists(dir) => dir.clone(),
            Some(dir) => {
                warn!("Output directory {} does not exist, writing next to the source", dir.display());
                Self::source_dir(source)
            }
            None => Self::source_dir(source),
        };
        FileManager::generate_output_path(source, output_dir, &self.config.target_language, "srt")
    }

    /// Where incremental mode keeps the blocks translated so far: `<output>.partial`
    pub fn partial_path_for(output: &Path) -> PathBuf {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".partial");
        output.with_file_name(name)
    }

    fn source_dir(source: &Path) -> PathBuf {
        source.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    /// Translate one subtitle file.
    ///
    /// An existing output short-circuits the run unless `force` is set. In
    /// atomic mode nothing is written unless every batch succeeds.
    pub async fn run(&self, source: &Path, force: bool, cancel: &CancellationToken) -> Result<RunOutcome, AppError> {
        let result = self.run_file(source, force, cancel).await;
        match &result {
            Ok(RunOutcome::Cancelled) => self.reporter.report(&StatusEvent::Cancelled {
                source: source.to_path_buf(),
            }),
            Err(e) => self.reporter.report(&StatusEvent::Failed {
                source: source.to_path_buf(),
                reason: e.to_string(),
            }),
            Ok(_) => {}
        }
        result
    }

    async fn run_file(&self, source: &Path, force: bool, cancel: &CancellationToken) -> Result<RunOutcome, AppError> {
        if !FileManager::file_exists(source) {
            return Err(AppError::File(format!("Subtitle file not found: {}", source.display())));
        }

        let output = self.output_path_for(source);
        if FileManager::file_exists(&output) && !force {
            debug!("Output {} exists, skipping", output.display());
            self.reporter.report(&StatusEvent::Skipped { output: output.clone() });
            return Ok(RunOutcome::AlreadyTranslated(output));
        }

        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        let mut subtitles = SubtitleCollection::from_file(source)?;
        if self.config.subtitle.strip_sdh {
            subtitles.strip_sdh();
        }

        self.reporter.report(&StatusEvent::Started {
            source: source.to_path_buf(),
            blocks: subtitles.entries.len(),
        });
        info!(
            "{}: {} -> {} with {}",
            source.display(),
            self.config.source_language,
            self.config.target_language,
            self.service.provider_name()
        );

        // Checkpoints go to a sibling file; the final path only ever holds a complete translation
        let partial_path = Self::partial_path_for(&output);
        let mut write_partial = |partial: &[SubtitleEntry]| Self::write_document(&partial_path, partial);
        let checkpoint: Option<Checkpoint<'_>> = match self.config.watcher.write_mode {
            WriteMode::Incremental => Some(&mut write_partial),
            WriteMode::Atomic => None,
        };

        let translated = match self.service
            .translate_entries(&subtitles.entries, cancel, self.reporter.as_ref(), checkpoint)
            .await
        {
            Ok(entries) => entries,
            Err(e) if e.is_cancellation() => return Ok(RunOutcome::Cancelled),
            Err(e) => return Err(e.into()),
        };

        Self::write_document(&output, &translated)?;
        if self.config.watcher.write_mode == WriteMode::Incremental {
            if let Err(e) = FileManager::remove_if_exists(&partial_path) {
                warn!("Could not remove {}: {}", partial_path.display(), e);
            }
        }
        self.reporter.report(&StatusEvent::Succeeded { output: output.clone() });
        Ok(RunOutcome::Translated(output))
    }

    fn write_document(output: &Path, entries: &[SubtitleEntry]) -> Result<(), TranslationError> {
        FileManager::write_atomic(output, &render_srt(entries)).map_err(|e| {
            TranslationError::Subtitle(SubtitleError::Io {
                path: output.to_path_buf(),
                message: e.to_string(),
            })
        })
    }
}
