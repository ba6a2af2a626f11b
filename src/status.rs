use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use parking_lot::Mutex;

// @module: User-facing status events for a translation run

/// Lifecycle of one file run, as seen by the user
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Parsing succeeded and translation is about to begin
    Started { source: PathBuf, blocks: usize },

    /// A batch finished
    Progress { completed: usize, total: usize },

    /// The translated document was written
    Succeeded { output: PathBuf },

    /// The output already existed and was left untouched
    Skipped { output: PathBuf },

    /// Playback stopped or the service is shutting down
    Cancelled { source: PathBuf },

    /// The run failed; nothing was written (atomic mode)
    Failed { source: PathBuf, reason: String },
}

impl StatusEvent {
    /// Completion percentage for progress events
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Progress { completed, total } if *total > 0 => {
                Some(((completed * 100) / total).min(100) as u8)
            }
            Self::Progress { .. } => Some(100),
            _ => None,
        }
    }
}

/// Sink for status events
pub trait StatusReporter: Send + Sync {
    fn report(&self, event: &StatusEvent);
}

/// Reports through the application log
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, event: &StatusEvent) {
        match event {
            StatusEvent::Started { source, blocks } => {
                info!("Translating {} ({} blocks)", source.display(), blocks)
            }
            StatusEvent::Progress { .. } => {
                info!("Translation progress: {}%", event.percent().unwrap_or(0))
            }
            StatusEvent::Succeeded { output } => info!("Translation finished: {}", output.display()),
            StatusEvent::Skipped { output } => info!("Already translated: {}", output.display()),
            StatusEvent::Cancelled { source } => info!("Translation of {} cancelled", source.display()),
            StatusEvent::Failed { source, reason } => {
                error!("Translation of {} failed: {}", source.display(), reason)
            }
        }
    }
}

/// Terminal progress bar for one-shot runs
pub struct ProgressBarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressBarReporter {
    pub fn new() -> Self {
        Self { bar: Mutex::new(None) }
    }

    fn create_bar(blocks: usize) -> ProgressBar {
        let bar = ProgressBar::new(blocks as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.set_message("Translating");
        bar
    }
}

impl Default for ProgressBarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ProgressBarReporter {
    fn report(&self, event: &StatusEvent) {
        let mut bar = self.bar.lock();
        match event {
            StatusEvent::Started { blocks, .. } => {
                *bar = Some(Self::create_bar(*blocks));
            }
            StatusEvent::Progress { completed, .. } => {
                if let Some(bar) = bar.as_ref() {
                    bar.set_position(*completed as u64);
                }
            }
            _ => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
                LogReporter.report(event);
            }
        }
    }
}
