/*!
 * Tests for the labeled-line alignment protocol
 */

use tokio_util::sync::CancellationToken;
use subwatch::providers::mock::MockProvider;
use subwatch::translation::alignment::{validate_response, AlignmentProtocol};
use subwatch::translation::{plan_batches, Batch, RetryPolicy};
use subwatch::TranslationError;

fn batch(lines: &[&str]) -> Batch {
    Batch { offset: 0, lines: lines.iter().map(|s| s.to_string()).collect() }
}

#[tokio::test]
async fn test_translate_batch_withAlignedResponse_shouldSucceedOnFirstAttempt() {
    let provider = MockProvider::reverse_case();
    let protocol = AlignmentProtocol::new(&provider, RetryPolicy::immediate(3), "English", "Romanian");

    let result = protocol
        .translate_batch(&batch(&["Hello", "Two[[BR]]lines"]), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.lines, vec!["hELLO", "tWO[[BR]]LINES"]);
    assert_eq!(result.attempts, 1);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_translate_batch_withRelabeledResponse_shouldUseAppearanceOrder() {
    let provider = MockProvider::scripted(vec!["L007: primul\nL003: al doilea".to_string()]);
    let protocol = AlignmentProtocol::new(&provider, RetryPolicy::immediate(1), "English", "Romanian");

    let result = protocol
        .translate_batch(&batch(&["first", "second"]), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.lines, vec!["primul", "al doilea"]);
}

#[tokio::test]
async fn test_translate_batch_withExtraLines_shouldRetry() {
    let provider = MockProvider::scripted(vec![
        "L000: a\nL001: b\nL002: extra".to_string(),
        "L000: a\nL001: b".to_string(),
    ]);
    let protocol = AlignmentProtocol::new(&provider, RetryPolicy::immediate(3), "English", "Romanian");

    let result = protocol
        .translate_batch(&batch(&["x", "y"]), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.attempts, 2);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_batch_withTransportErrors_shouldExhaustAttempts() {
    let provider = MockProvider::failing();
    let protocol = AlignmentProtocol::new(&provider, RetryPolicy::immediate(2), "English", "Romanian");

    let error = protocol
        .translate_batch(&batch(&["x"]), 4, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        TranslationError::BatchFailure { batch, attempts, last_error, .. } => {
            assert_eq!(batch, 4);
            assert_eq!(attempts, 2);
            assert!(last_error.contains("Simulated provider failure"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_request_for_withLargeBatch_shouldLabelEveryLine() {
    let provider = MockProvider::echo();
    let protocol = AlignmentProtocol::new(&provider, RetryPolicy::default(), "English", "Romanian");
    let lines: Vec<String> = (0..150).map(|i| format!("line {}", i)).collect();
    let batches = plan_batches(&lines, 150);

    let request = protocol.request_for(&batches[0]);
    let body: Vec<&str> = request.content.lines().collect();

    assert_eq!(body.len(), 150);
    assert_eq!(body[0], "L000: line 0");
    assert_eq!(body[149], "L149: line 149");
    assert!(request.instructions.contains("exactly 150 lines"));
}

#[test]
fn test_validate_response_withCodeFenceAndChatter_shouldExtractLabeledLines() {
    let raw = "Here is the translation:\n```\nL000: Unu\nL001: Doi\n```\nHope this helps!";
    assert_eq!(validate_response(raw, 2).unwrap(), vec!["Unu", "Doi"]);
}
