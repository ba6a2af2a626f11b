/*!
 * Change watcher.
 *
 * A polling state machine that notices a new subtitle file while something is
 * playing and runs the translation pipeline for it exactly once:
 *
 * - `Idle` -> `Scanning` when playback starts
 * - `Scanning` -> `Dispatching` when a new candidate file is found
 * - `Dispatching` -> `Scanning` when the run ends, whatever its outcome
 * - any phase -> `Idle` when playback stops, forgetting the last processed file
 *
 * Only one run is active at a time because the dispatch is awaited inline.
 *
 * Candidates: the subtitle the player reports comes first. Otherwise only the
 * newest qualifying `.srt` in the watch directory is considered, so of several
 * files arriving within one poll window the older ones are never dispatched.
 * A file counts as new when its path or its size and mtime differ from the
 * last processed one.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app_controller::{Controller, RunOutcome};
use crate::file_utils::{FileInfo, FileManager, FileSignature};
use crate::language_utils;

pub mod playback;

pub use self::playback::{ManualPlayback, PlaybackMonitor, PlayerStatus, StatusFilePlayback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatcherPhase {
    #[default]
    Idle,
    Scanning,
    Dispatching,
}

/// What the watcher remembers between polls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    pub phase: WatcherPhase,
    pub last_processed_path: Option<PathBuf>,
    pub last_processed_signature: Option<FileSignature>,
}

impl WatcherState {
    /// A file is new unless it is the last processed one, unchanged
    pub fn is_new(&self, path: &Path, signature: &FileSignature) -> bool {
        self.last_processed_path.as_deref() != Some(path)
            || self.last_processed_signature.as_ref() != Some(signature)
    }

    pub fn record(&mut self, path: PathBuf, signature: FileSignature) {
        self.last_processed_path = Some(path);
        self.last_processed_signature = Some(signature);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of one polling cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing is playing
    Idle,
    /// Playback just stopped; state was reset
    Stopped,
    /// Playing, but no new subtitle file
    NoCandidate,
    /// A run finished
    Dispatched { source: PathBuf, outcome: RunOutcome },
    /// A run failed; polling continues
    Failed { source: PathBuf, reason: String },
}

pub struct ChangeWatcher {
    controller: Controller,
    playback: Arc<dyn PlaybackMonitor>,
    state: WatcherState,
    /// How often playback is checked while a run is in flight
    guard_interval: Duration,
}

impl ChangeWatcher {
    pub fn new(controller: Controller, playback: Arc<dyn PlaybackMonitor>) -> Self {
        let guard_interval = controller.config().watcher.poll_interval();
        Self {
            controller,
            playback,
            state: WatcherState::default(),
            guard_interval,
        }
    }

    pub fn with_guard_interval(mut self, interval: Duration) -> Self {
        self.guard_interval = interval;
        self
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Poll until `shutdown` fires
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let interval = self.controller.config().watcher.poll_interval();
        info!("Watching for new subtitles every {}s", interval.as_secs());

        while !shutdown.is_cancelled() {
            let outcome = self.poll_once(&shutdown).await;
            debug!("Poll finished: {:?}", outcome);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("Watcher stopped");
    }

    /// Run one polling cycle
    pub async fn poll_once(&mut self, shutdown: &CancellationToken) -> PollOutcome {
        if !self.playback.is_playing().await {
            if self.state.phase == WatcherPhase::Idle {
                return PollOutcome::Idle;
            }
            info!("Playback stopped");
            self.state.reset();
            return PollOutcome::Stopped;
        }

        if self.state.phase == WatcherPhase::Idle {
            info!("Playback started, looking for subtitles");
            self.state.phase = WatcherPhase::Scanning;
        }

        match self.find_candidate().await {
            Some(candidate) => self.dispatch(candidate, shutdown).await,
            None => PollOutcome::NoCandidate,
        }
    }

    async fn find_candidate(&self) -> Option<FileInfo> {
        if let Some(path) = self.playback.current_subtitle().await {
            if let Some(candidate) = self.playing_candidate(&path) {
                return Some(candidate);
            }
        }
        self.directory_candidate()
    }

    /// The subtitle the player reports, if it is a new source file
    fn playing_candidate(&self, path: &Path) -> Option<FileInfo> {
        if !Self::is_subtitle(path) || !FileManager::file_exists(path) || self.is_translation(path) {
            return None;
        }
        let signature = FileManager::signature(path).ok()?;
        self.state.is_new(path, &signature).then(|| FileInfo {
            path: path.to_path_buf(),
            signature,
        })
    }

    /// The newest qualifying subtitle in the watch directory, if it is new
    fn directory_candidate(&self) -> Option<FileInfo> {
        let watcher = &self.controller.config().watcher;
        let dir = watcher.watch_dir.as_ref()?;

        let files = match FileManager::list_files(dir, "srt") {
            Ok(files) => files,
            Err(e) => {
                warn!("Cannot scan {}: {}", dir.display(), e);
                return None;
            }
        };

        let now = SystemTime::now();
        let newest = files
            .into_iter()
            .filter(|file| !self.is_translation(&file.path))
            .filter(|file| file.signature.size > watcher.min_file_bytes)
            .filter(|file| {
                now.duration_since(file.signature.modified).unwrap_or_default() <= watcher.max_file_age()
            })
            .max_by_key(|file| file.signature.modified)?;

        self.state.is_new(&newest.path, &newest.signature).then_some(newest)
    }

    fn is_subtitle(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("srt"))
    }

    /// Whether the file name already says it is in the target language
    fn is_translation(&self, path: &Path) -> bool {
        language_utils::filename_indicates_language(path, &self.controller.config().target_language)
    }

    async fn dispatch(&mut self, candidate: FileInfo, shutdown: &CancellationToken) -> PollOutcome {
        self.state.phase = WatcherPhase::Dispatching;
        info!("New subtitle: {}", candidate.path.display());

        let run_token = shutdown.child_token();
        let guard = self.spawn_playback_guard(run_token.clone());
        let result = self.controller.run(&candidate.path, false, &run_token).await;
        guard.abort();

        self.state.record(candidate.path.clone(), candidate.signature);
        self.state.phase = WatcherPhase::Scanning;

        match result {
            Ok(outcome) => {
                if let RunOutcome::Translated(output) = &outcome {
                    if let Err(e) = self.playback.activate_subtitle(output).await {
                        warn!("Could not activate {}: {}", output.display(), e);
                    }
                }
                PollOutcome::Dispatched { source: candidate.path, outcome }
            }
            Err(e) => {
                warn!("Resuming polling after failed run for {}", candidate.path.display());
                PollOutcome::Failed { source: candidate.path, reason: e.to_string() }
            }
        }
    }

    /// Cancel `token` as soon as playback stops
    fn spawn_playback_guard(&self, token: CancellationToken) -> JoinHandle<()> {
        let playback = Arc::clone(&self.playback);
        let interval = self.guard_interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        if !playback.is_playing().await {
                            info!("Playback stopped, cancelling translation");
                            token.cancel();
                            break;
                        }
                    }
                }
            }
        })
    }
}
