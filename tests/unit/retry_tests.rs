/*!
 * Tests for the translate-review retry controller
 */

use cvlingo::errors::PipelineError;
use cvlingo::language::LanguageRegistry;
use cvlingo::translation::{
    ChannelObserver, NoopObserver, RetryController, RetryPhase, TransitionEvent, TranslationTask,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::common::{self, stubs::{ScriptedReviewer, StubProducer, UnavailableReviewer}};

fn drain(receiver: &mut UnboundedReceiver<TransitionEvent>) -> Vec<TransitionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_run_withAlwaysPassingReviewer_shouldAcceptFirstCandidate() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();

    let controller = RetryController::new(&producer, &reviewer, 2).unwrap();
    let outcome = controller.run(&task, &NoopObserver).await.unwrap();

    assert!(outcome.reviewed_pass);
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(outcome.state.phase, RetryPhase::Accepted);
    assert_eq!(producer.call_count(), 1);
    assert_eq!(reviewer.call_count(), 1);
    assert_eq!(outcome.artifact.language_code, "ru");
}

#[tokio::test]
async fn test_run_withAlwaysFailingReviewer_shouldExhaustAndReturnLastCandidate() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_fail();

    let controller = RetryController::new(&producer, &reviewer, 3).unwrap();
    let outcome = controller.run(&task, &NoopObserver).await.unwrap();

    assert!(!outcome.reviewed_pass);
    assert_eq!(outcome.state.phase, RetryPhase::Exhausted);
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(producer.call_count(), 3);
    assert_eq!(outcome.artifact.html, "<p>ru draft 3</p>");
    assert_eq!(outcome.history().len(), 3);
    assert!(outcome.history().iter().all(|r| !r.verdict.passed));
}

#[tokio::test]
async fn test_run_withFailThenPass_shouldHandReviewerFeedbackToSecondAttempt() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::fail_then_pass();

    let controller = RetryController::new(&producer, &reviewer, 2).unwrap();
    let outcome = controller.run(&task, &NoopObserver).await.unwrap();

    assert!(outcome.reviewed_pass);
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.artifact.html, "<p>ru draft 2</p>");

    let feedback = producer.feedback_log();
    assert_eq!(feedback.len(), 2);
    assert!(feedback[0].is_none());
    let second = feedback[1].as_ref().unwrap();
    assert_eq!(second.previous_html, "<p>ru draft 1</p>");
    assert!(second.notes.contains("Issues: stiff phrasing in review 1"));
    assert!(second.notes.contains("Suggestions: use active voice"));
}

#[tokio::test]
async fn test_run_shouldEmitTwoEventsPerAttemptPlusTerminal() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("de").unwrap());

    for (reviewer, max_attempts) in [
        (ScriptedReviewer::always_pass(), 2),
        (ScriptedReviewer::fail_then_pass(), 2),
        (ScriptedReviewer::always_fail(), 3),
    ] {
        let producer = StubProducer::new();
        let (observer, mut receiver) = ChannelObserver::channel();

        let controller = RetryController::new(&producer, &reviewer, max_attempts).unwrap();
        let outcome = controller.run(&task, &observer).await.unwrap();
        let events = drain(&mut receiver);

        assert_eq!(events.len() as u32, outcome.attempts() * 2 + 1);
        assert!(events.last().unwrap().phase.is_terminal());
        assert!(events[..events.len() - 1].iter().all(|e| !e.phase.is_terminal()));
    }
}

#[tokio::test]
async fn test_run_withFailThenPass_shouldEmitEventsInOrder() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::fail_then_pass();
    let (observer, mut receiver) = ChannelObserver::channel();

    let controller = RetryController::new(&producer, &reviewer, 2).unwrap();
    controller.run(&task, &observer).await.unwrap();
    let events = drain(&mut receiver);

    let phases: Vec<(RetryPhase, u32)> = events.iter().map(|e| (e.phase, e.attempt)).collect();
    assert_eq!(
        phases,
        vec![
            (RetryPhase::Producing, 1),
            (RetryPhase::Reviewing, 1),
            (RetryPhase::Producing, 2),
            (RetryPhase::Reviewing, 2),
            (RetryPhase::Accepted, 2),
        ]
    );
    assert_eq!(events[0].status_message(), "Translating to Russian...");
    assert_eq!(events[2].status_message(), "Refining Russian translation (attempt 2)...");
    assert!(events[2].verdict.as_ref().is_some_and(|v| !v.passed));
    assert!(events[4].verdict.as_ref().is_some_and(|v| v.passed));
}

#[tokio::test]
async fn test_run_withUnavailableProducer_shouldPropagateWithoutReview() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::unavailable();
    let reviewer = ScriptedReviewer::always_pass();

    let controller = RetryController::new(&producer, &reviewer, 3).unwrap();
    let err = controller.run(&task, &NoopObserver).await.unwrap_err();

    assert!(matches!(err, PipelineError::GenerationUnavailable(_)));
    assert!(err.is_retryable_later());
    assert_eq!(producer.call_count(), 1);
    assert_eq!(reviewer.call_count(), 0);
}

#[tokio::test]
async fn test_run_withUnavailableReviewer_shouldNotRetry() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();

    let controller = RetryController::new(&producer, &UnavailableReviewer, 3).unwrap();
    let err = controller.run(&task, &NoopObserver).await.unwrap_err();

    assert!(matches!(err, PipelineError::ReviewUnavailable(_)));
    assert_eq!(producer.call_count(), 1);
}

#[test]
fn test_new_withZeroAttempts_shouldFail() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();

    let result = RetryController::new(&producer, &reviewer, 0);
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[tokio::test]
async fn test_run_shouldLeaveSourceArtifactUntouched() {
    let registry = LanguageRegistry::builtin();
    let source = common::sample_artifact();
    let before = source.clone();
    let task = TranslationTask::new(&source, registry.get("ru").unwrap());
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_fail();

    let controller = RetryController::new(&producer, &reviewer, 2).unwrap();
    let outcome = controller.run(&task, &NoopObserver).await.unwrap();

    assert_eq!(source, before);
    assert_eq!(outcome.artifact.source_checksum, source.source_checksum);
}
