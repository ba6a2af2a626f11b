/*!
 * Tests for the playback-driven change watcher
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use subwatch::app_controller::RunOutcome;
use subwatch::providers::mock::MockProvider;
use subwatch::watcher::{ChangeWatcher, ManualPlayback, PollOutcome, WatcherPhase};
use crate::common;

fn watcher_for(provider: &MockProvider, watch_dir: &Path, playback: Arc<ManualPlayback>) -> ChangeWatcher {
    let mut config = common::test_config();
    config.watcher.watch_dir = Some(watch_dir.to_path_buf());
    let (controller, _) = common::controller_with(provider, config);
    ChangeWatcher::new(controller, playback)
}

#[tokio::test]
async fn test_poll_once_withNewSubtitle_shouldDispatchExactlyOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::echo();
    let playback = Arc::new(ManualPlayback::always_playing());
    let mut watcher = watcher_for(&provider, temp_dir.path(), playback.clone());
    let shutdown = CancellationToken::new();

    let first = watcher.poll_once(&shutdown).await;
    let output = temp_dir.path().join("movie.ro.srt");
    assert_eq!(
        first,
        PollOutcome::Dispatched { source: source.clone(), outcome: RunOutcome::Translated(output.clone()) }
    );
    assert_eq!(playback.activated(), vec![output]);
    assert_eq!(watcher.state().phase, WatcherPhase::Scanning);
    assert_eq!(watcher.state().last_processed_path.as_deref(), Some(source.as_path()));

    // Same file, unchanged: nothing to do
    assert_eq!(watcher.poll_once(&shutdown).await, PollOutcome::NoCandidate);
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withPlaybackStopped_shouldResetAndSkipOnReplay() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::echo();
    let playback = Arc::new(ManualPlayback::always_playing());
    let mut watcher = watcher_for(&provider, temp_dir.path(), playback.clone());
    let shutdown = CancellationToken::new();

    watcher.poll_once(&shutdown).await;

    playback.set_playing(false);
    assert_eq!(watcher.poll_once(&shutdown).await, PollOutcome::Stopped);
    assert_eq!(watcher.state().phase, WatcherPhase::Idle);
    assert!(watcher.state().last_processed_path.is_none());
    assert_eq!(watcher.poll_once(&shutdown).await, PollOutcome::Idle);

    playback.set_playing(true);
    let replay = watcher.poll_once(&shutdown).await;
    assert_eq!(
        replay,
        PollOutcome::Dispatched {
            source,
            outcome: RunOutcome::AlreadyTranslated(temp_dir.path().join("movie.ro.srt")),
        }
    );
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withPlaybackStoppingMidRun_shouldCancelTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::slow(60_000);
    let playback = Arc::new(ManualPlayback::always_playing());
    let mut watcher = watcher_for(&provider, temp_dir.path(), playback.clone())
        .with_guard_interval(Duration::from_millis(50));

    let stopper = playback.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stopper.set_playing(false);
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), watcher.poll_once(&CancellationToken::new()))
        .await?;

    assert!(matches!(outcome, PollOutcome::Dispatched { outcome: RunOutcome::Cancelled, .. }));
    assert!(!temp_dir.path().join("movie.ro.srt").exists());
    assert!(playback.activated().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withFailedRun_shouldNotRetrySameFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::always_mismatch();
    let playback = Arc::new(ManualPlayback::always_playing());
    let mut watcher = watcher_for(&provider, temp_dir.path(), playback);
    let shutdown = CancellationToken::new();

    let first = watcher.poll_once(&shutdown).await;
    assert!(matches!(first, PollOutcome::Failed { source: ref failed, .. } if failed == &source));
    assert_eq!(watcher.state().phase, WatcherPhase::Scanning);

    assert_eq!(watcher.poll_once(&shutdown).await, PollOutcome::NoCandidate);
    assert_eq!(provider.request_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withSmallOldAndTranslatedFiles_shouldIgnoreThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "tiny.srt", "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;
    let old = common::create_test_subtitle(temp_dir.path(), "old.srt")?;
    common::set_age(&old, Duration::from_secs(1200))?;
    common::create_test_subtitle(temp_dir.path(), "show.ro.srt")?;

    let provider = MockProvider::echo();
    let mut watcher = watcher_for(&provider, temp_dir.path(), Arc::new(ManualPlayback::always_playing()));

    assert_eq!(watcher.poll_once(&CancellationToken::new()).await, PollOutcome::NoCandidate);
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withSeveralCandidates_shouldPickNewest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let older = common::create_test_subtitle(temp_dir.path(), "episode1.srt")?;
    common::set_age(&older, Duration::from_secs(120))?;
    let newest = common::create_test_subtitle(temp_dir.path(), "episode2.srt")?;

    let provider = MockProvider::echo();
    let mut watcher = watcher_for(&provider, temp_dir.path(), Arc::new(ManualPlayback::always_playing()));

    let outcome = watcher.poll_once(&CancellationToken::new()).await;
    assert!(matches!(outcome, PollOutcome::Dispatched { ref source, .. } if source == &newest));
    assert!(!temp_dir.path().join("episode1.ro.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_poll_once_withPlayingSubtitle_shouldPreferIt() -> Result<()> {
    let watch_dir = common::create_temp_dir()?;
    let media_dir = common::create_temp_dir()?;
    common::create_test_subtitle(watch_dir.path(), "download.srt")?;
    let playing = common::create_test_subtitle(media_dir.path(), "film.srt")?;

    let playback = Arc::new(ManualPlayback::always_playing());
    playback.set_subtitle(Some(playing.clone()));
    let provider = MockProvider::echo();
    let mut watcher = watcher_for(&provider, watch_dir.path(), playback);

    let outcome = watcher.poll_once(&CancellationToken::new()).await;
    assert_eq!(
        outcome,
        PollOutcome::Dispatched {
            source: playing,
            outcome: RunOutcome::Translated(media_dir.path().join("film.ro.srt")),
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withShutdownToken_shouldReturn() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::echo();
    let mut watcher = watcher_for(&provider, temp_dir.path(), Arc::new(ManualPlayback::new(false)));
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), watcher.run(shutdown)).await?;
    Ok(())
}
