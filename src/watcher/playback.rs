use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// @module: Playback state sources for the change watcher

/// What the media player is doing right now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Whether something is playing
    #[serde(default)]
    pub playing: bool,

    /// Subtitle file the player currently shows, if any
    #[serde(default)]
    pub subtitle: Option<PathBuf>,
}

/// Read-only view of the media player
#[async_trait]
pub trait PlaybackMonitor: Send + Sync {
    async fn is_playing(&self) -> bool;

    /// Subtitle path reported by the player
    async fn current_subtitle(&self) -> Option<PathBuf>;

    /// Ask the player to show a freshly translated subtitle
    async fn activate_subtitle(&self, path: &Path) -> anyhow::Result<()> {
        debug!("No player integration to activate {}", path.display());
        Ok(())
    }
}

/// Playback state written as JSON by a player plugin.
///
/// Format: `{"playing": true, "subtitle": "/path/to/file.srt"}`. A missing or
/// unreadable file means nothing is playing.
#[derive(Debug, Clone)]
pub struct StatusFilePlayback {
    path: PathBuf,
}

impl StatusFilePlayback {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn read_status(&self) -> PlayerStatus {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(_) => return PlayerStatus::default(),
        };
        match serde_json::from_str(&content) {
            Ok(status) => status,
            Err(e) => {
                warn!("Ignoring malformed status file {}: {}", self.path.display(), e);
                PlayerStatus::default()
            }
        }
    }
}

#[async_trait]
impl PlaybackMonitor for StatusFilePlayback {
    async fn is_playing(&self) -> bool {
        self.read_status().await.playing
    }

    async fn current_subtitle(&self) -> Option<PathBuf> {
        let status = self.read_status().await;
        if status.playing { status.subtitle } else { None }
    }
}

/// Playback state held in memory and set by the caller.
///
/// Used for plain directory watching (always playing) and by tests.
#[derive(Debug, Default)]
pub struct ManualPlayback {
    status: Mutex<PlayerStatus>,
    activated: Mutex<Vec<PathBuf>>,
}

impl ManualPlayback {
    pub fn new(playing: bool) -> Self {
        Self {
            status: Mutex::new(PlayerStatus { playing, subtitle: None }),
            activated: Mutex::new(Vec::new()),
        }
    }

    /// Always playing, no subtitle of its own
    pub fn always_playing() -> Self {
        Self::new(true)
    }

    pub fn set_playing(&self, playing: bool) {
        self.status.lock().playing = playing;
    }

    pub fn set_subtitle(&self, subtitle: Option<PathBuf>) {
        self.status.lock().subtitle = subtitle;
    }

    /// Subtitles activated so far, in order
    pub fn activated(&self) -> Vec<PathBuf> {
        self.activated.lock().clone()
    }
}

#[async_trait]
impl PlaybackMonitor for ManualPlayback {
    async fn is_playing(&self) -> bool {
        self.status.lock().playing
    }

    async fn current_subtitle(&self) -> Option<PathBuf> {
        self.status.lock().subtitle.clone()
    }

    async fn activate_subtitle(&self, path: &Path) -> anyhow::Result<()> {
        self.activated.lock().push(path.to_path_buf());
        Ok(())
    }
}
