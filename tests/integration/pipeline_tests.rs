/*!
 * End-to-end tests for one translation run: parse, batch, align, recompose, write
 */

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use subwatch::app_config::WriteMode;
use subwatch::app_controller::RunOutcome;
use subwatch::providers::mock::MockProvider;
use subwatch::status::StatusEvent;
use subwatch::subtitle_processor::SubtitleCollection;
use crate::common;

/// A valid answer for the first batch of a ten-line batch plan
fn first_batch_of_ten() -> String {
    (0..10)
        .map(|i| format!("L{:03}: Linia {}", i, i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_run_withShortDialogue_shouldWriteExactDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(
        temp_dir.path(),
        "dialogue.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
         2\n00:00:02,500 --> 00:00:04,000\nHow are you\n\n\
         3\n00:00:05,000 --> 00:00:06,000\nGoodbye\n\n",
    )?;
    let provider = MockProvider::reverse_case();
    let (controller, _) = common::controller_with(&provider, common::test_config());

    controller.run(&source, false, &CancellationToken::new()).await?;

    let written = std::fs::read_to_string(temp_dir.path().join("dialogue.ro.srt"))?;
    assert_eq!(
        written,
        "1\n00:00:01,000 --> 00:00:02,000\nhELLO\n\n\
         2\n00:00:02,500 --> 00:00:04,000\nhOW ARE YOU\n\n\
         3\n00:00:05,000 --> 00:00:06,000\ngOODBYE\n"
    );
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_withReverseCaseProvider_shouldKeepStructureAndTiming() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::reverse_case();
    let (controller, reporter) = common::controller_with(&provider, common::test_config());

    let outcome = controller.run(&source, false, &CancellationToken::new()).await?;

    let output = temp_dir.path().join("movie.ro.srt");
    assert_eq!(outcome, RunOutcome::Translated(output.clone()));
    assert_eq!(provider.request_count(), 1);

    let translated = SubtitleCollection::from_file(&output)?;
    let texts: Vec<String> = translated.entries.iter().map(|e| e.text()).collect();
    assert_eq!(
        texts,
        vec!["tHIS IS A TEST SUBTITLE.", "iT CONTAINS <I>MULTIPLE</I>\nLINES.", "fOR TESTING PURPOSES."]
    );

    let original = SubtitleCollection::from_file(&source)?;
    for (before, after) in original.entries.iter().zip(&translated.entries) {
        assert_eq!(before.index, after.index);
        assert_eq!(before.start_time_ms, after.start_time_ms);
        assert_eq!(before.end_time_ms, after.end_time_ms);
    }

    let events = reporter.events();
    assert!(matches!(events.first(), Some(StatusEvent::Started { blocks: 3, .. })));
    assert_eq!(events.last(), Some(&StatusEvent::Succeeded { output }));
    Ok(())
}

#[tokio::test]
async fn test_run_withManyBlocks_shouldSendOneRequestPerBatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "long.srt", &common::numbered_srt(25))?;
    let provider = MockProvider::echo();
    let (controller, reporter) = common::controller_with(&provider, common::test_config());

    controller.run(&source, false, &CancellationToken::new()).await?;

    assert_eq!(provider.request_count(), 3);
    let progress: Vec<usize> = reporter
        .events()
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Progress { completed, .. } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![10, 20, 25]);

    let translated = SubtitleCollection::from_file(temp_dir.path().join("long.ro.srt"))?;
    assert_eq!(translated.entries.len(), 25);
    assert_eq!(translated.entries[24].lines, vec!["Line 25"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withTransientMismatch_shouldRetryAndSucceed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::mismatch_first(2);
    let (controller, _) = common::controller_with(&provider, common::test_config());

    let outcome = controller.run(&source, false, &CancellationToken::new()).await?;

    assert!(matches!(outcome, RunOutcome::Translated(_)));
    assert_eq!(provider.request_count(), 3);

    // Every attempt sent the same batch
    let requests = provider.requests();
    assert!(requests.iter().all(|r| r.content == requests[0].content));
    Ok(())
}

#[tokio::test]
async fn test_run_withPersistentMismatch_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::always_mismatch();
    let (controller, reporter) = common::controller_with(&provider, common::test_config());

    let result = controller.run(&source, false, &CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 3);
    assert!(!temp_dir.path().join("movie.ro.srt").exists());
    assert!(matches!(reporter.events().last(), Some(StatusEvent::Failed { .. })));
    Ok(())
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipWithoutProviderCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let existing = common::create_test_file(temp_dir.path(), "movie.ro.srt", "already here")?;
    let provider = MockProvider::echo();
    let (controller, reporter) = common::controller_with(&provider, common::test_config());

    let outcome = controller.run(&source, false, &CancellationToken::new()).await?;

    assert_eq!(outcome, RunOutcome::AlreadyTranslated(existing.clone()));
    assert_eq!(provider.request_count(), 0);
    assert_eq!(std::fs::read_to_string(&existing)?, "already here");
    assert_eq!(reporter.events(), vec![StatusEvent::Skipped { output: existing }]);
    Ok(())
}

#[tokio::test]
async fn test_run_withForce_shouldOverwriteExistingOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let existing = common::create_test_file(temp_dir.path(), "movie.ro.srt", "stale")?;
    let provider = MockProvider::echo();
    let (controller, _) = common::controller_with(&provider, common::test_config());

    controller.run(&source, true, &CancellationToken::new()).await?;

    assert_eq!(std::fs::read_to_string(&existing)?, common::SAMPLE_SRT);
    Ok(())
}

#[tokio::test]
async fn test_run_withIncrementalMode_shouldKeepCompletedBatchesOnFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "long.srt", &common::numbered_srt(15))?;
    let provider = MockProvider::scripted(vec![first_batch_of_ten(), "Sorry, I cannot help with that.".to_string()]);

    let mut config = common::test_config();
    config.watcher.write_mode = WriteMode::Incremental;
    let (controller, _) = common::controller_with(&provider, config);

    let result = controller.run(&source, false, &CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 4);
    assert!(!temp_dir.path().join("long.ro.srt").exists());
    let partial = SubtitleCollection::from_file(temp_dir.path().join("long.ro.srt.partial"))?;
    assert_eq!(partial.entries.len(), 10);
    assert_eq!(partial.entries[9].lines, vec!["Linia 10"]);
    Ok(())
}

#[tokio::test]
async fn test_run_withIncrementalModeAfterFailure_shouldRetranslateOnNextRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "long.srt", &common::numbered_srt(15))?;
    let mut config = common::test_config();
    config.watcher.write_mode = WriteMode::Incremental;

    let failing = MockProvider::scripted(vec![first_batch_of_ten(), "garbage".to_string()]);
    let (controller, _) = common::controller_with(&failing, config.clone());
    assert!(controller.run(&source, false, &CancellationToken::new()).await.is_err());

    let healthy = MockProvider::echo();
    let (controller, _) = common::controller_with(&healthy, config);
    let outcome = controller.run(&source, false, &CancellationToken::new()).await?;

    let output = temp_dir.path().join("long.ro.srt");
    assert_eq!(outcome, RunOutcome::Translated(output.clone()));
    assert_eq!(healthy.request_count(), 2);
    assert_eq!(SubtitleCollection::from_file(&output)?.entries.len(), 15);
    assert!(!temp_dir.path().join("long.ro.srt.partial").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withAtomicMode_shouldWriteNothingOnLaterFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(temp_dir.path(), "long.srt", &common::numbered_srt(15))?;
    let provider = MockProvider::scripted(vec![first_batch_of_ten(), "garbage".to_string()]);
    let (controller, _) = common::controller_with(&provider, common::test_config());

    let result = controller.run(&source, false, &CancellationToken::new()).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("long.ro.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withCancelledToken_shouldReturnCancelled() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let provider = MockProvider::echo();
    let (controller, reporter) = common::controller_with(&provider, common::test_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = controller.run(&source, false, &cancel).await?;

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(provider.request_count(), 0);
    assert!(matches!(reporter.events().last(), Some(StatusEvent::Cancelled { .. })));
    Ok(())
}

#[tokio::test]
async fn test_run_withSdhStripping_shouldTranslateCleanedText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "1\n00:00:01,000 --> 00:00:02,000\n[DOOR CREAKS]\nJOHN: Who's there?\n\n\
                   2\n00:00:03,000 --> 00:00:04,000\nNobody. (laughs)\n";
    let source = common::create_test_file(temp_dir.path(), "movie.srt", content)?;
    let provider = MockProvider::echo();
    let mut config = common::test_config();
    config.subtitle.strip_sdh = true;
    let (controller, _) = common::controller_with(&provider, config);

    controller.run(&source, false, &CancellationToken::new()).await?;

    let translated = SubtitleCollection::from_file(temp_dir.path().join("movie.ro.srt"))?;
    assert_eq!(translated.entries[0].lines, vec!["Who's there?"]);
    assert_eq!(translated.entries[1].lines, vec!["Nobody."]);
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingSource_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let provider = MockProvider::echo();
    let (controller, _) = common::controller_with(&provider, common::test_config());

    let result = controller
        .run(&temp_dir.path().join("nope.srt"), false, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 0);
}
