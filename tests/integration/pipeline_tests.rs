/*!
 * Integration tests for the optimize-then-translate coordinator.
 *
 * Upstream gating, translation and review are all stubbed, so these tests
 * exercise routing and short-circuit rules rather than output quality.
 */

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cvlingo::app_config::Config;
use cvlingo::artifact::{JobPosting, ResumeArtifact, ResumeSource};
use cvlingo::errors::PipelineError;
use cvlingo::language::LanguageRegistry;
use cvlingo::pipeline::{
    DraftContext, FilterChain, GatedOptimizer, KeywordCoverage, MarkupValidator, OutcomeStatus,
    PipelineCoordinator, ResumeDrafter,
};
use cvlingo::translation::{ChannelObserver, NoopObserver};

use crate::common::{self, stubs::{ScriptedReviewer, StubOptimizer, StubProducer}};

fn coordinator(
    producer: &StubProducer,
    reviewer: &ScriptedReviewer,
) -> PipelineCoordinator {
    PipelineCoordinator::new(
        Arc::new(LanguageRegistry::builtin()),
        Arc::new(producer.clone()),
        Arc::new(reviewer.clone()),
    )
}

/// Drafter that only covers the job keywords once it has seen a failed validation.
#[derive(Default)]
struct LearningDrafter {
    seen_issues: Mutex<Vec<String>>,
}

#[async_trait]
impl ResumeDrafter for LearningDrafter {
    async fn draft(
        &self,
        _source: &ResumeSource,
        _job: &JobPosting,
        context: &DraftContext<'_>,
    ) -> Result<ResumeArtifact, PipelineError> {
        match context.validation {
            None => Ok(ResumeArtifact::new("<p>Jane Doe, backend engineer</p>", "en")),
            Some(validation) => {
                self.seen_issues.lock().unwrap().extend(validation.failed_issues());
                Ok(ResumeArtifact::new(common::SAMPLE_RESUME_HTML, "en"))
            }
        }
    }
}

#[tokio::test]
async fn test_run_withDefaultLanguageTarget_shouldNeverInvokeProducer() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let optimizer = StubOptimizer::approving(common::sample_artifact());
    let pipeline = coordinator(&producer, &reviewer).with_optimizer(Arc::new(optimizer.clone()));

    for target in [Some("en"), Some("EN"), Some("eng"), Some("none"), Some(""), None] {
        let outcome = pipeline
            .run(&common::sample_source(), &common::sample_job(), target, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Untranslated);
        assert_eq!(outcome.language_code, "en");
        assert_eq!(outcome.attempts, 0);
        assert!(!outcome.is_translated());
    }

    assert_eq!(producer.call_count(), 0);
    assert_eq!(reviewer.call_count(), 0);
    assert_eq!(optimizer.call_count(), 6);
}

#[tokio::test]
async fn test_run_withForeignTarget_shouldTranslateApprovedArtifact() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::fail_then_pass();
    let optimizer = StubOptimizer::approving(common::sample_artifact());
    let pipeline = coordinator(&producer, &reviewer).with_optimizer(Arc::new(optimizer));
    let source = common::sample_source();

    let outcome = pipeline
        .run(&source, &common::sample_job(), Some("ru"), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Accepted);
    assert_eq!(outcome.language_code, "ru");
    assert_eq!(outcome.artifact.language_code, "ru");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.artifact.source_checksum, source.checksum());
    assert_eq!(outcome.history.len(), 2);
}

#[tokio::test]
async fn test_run_withUnknownTarget_shouldFailBeforeOptimizing() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let optimizer = StubOptimizer::approving(common::sample_artifact());
    let pipeline = coordinator(&producer, &reviewer).with_optimizer(Arc::new(optimizer.clone()));

    let err = pipeline
        .run(&common::sample_source(), &common::sample_job(), Some("xx"), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnknownLanguage(code) if code == "xx"));
    assert_eq!(optimizer.call_count(), 0);
    assert_eq!(producer.call_count(), 0);
}

#[tokio::test]
async fn test_run_withRejectedDraft_shouldNotTranslate() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer)
        .with_optimizer(Arc::new(StubOptimizer::rejecting()));

    let err = pipeline
        .run(&common::sample_source(), &common::sample_job(), Some("ru"), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FilterFailure(_)));
    assert_eq!(producer.call_count(), 0);
}

#[tokio::test]
async fn test_run_withoutOptimizer_shouldFailWithConfigError() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();

    let err = coordinator(&producer, &reviewer)
        .run(&common::sample_source(), &common::sample_job(), Some("ru"), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn test_run_withGatedOptimizer_shouldRedraftThenTranslate() {
    common::init_test_logger();
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let chain = FilterChain::new()
        .with_filter(Arc::new(MarkupValidator))
        .with_filter(Arc::new(KeywordCoverage::new(0.9)));
    let mut config = Config::default();
    config.max_iterations = 3;
    let optimizer = GatedOptimizer::from_config(&config, LearningDrafter::default(), chain);
    let pipeline = coordinator(&producer, &reviewer).with_optimizer(Arc::new(optimizer));
    let source = common::sample_source();

    let outcome = pipeline
        .run(&source, &common::sample_job(), Some("de"), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Accepted);
    assert_eq!(outcome.language_code, "de");
    assert_eq!(outcome.artifact.source_checksum, source.checksum());
    assert_eq!(producer.call_count(), 1);
}

#[tokio::test]
async fn test_translateExisting_twice_shouldNotMutateSource() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer);
    let approved = common::sample_artifact();
    let before = approved.clone();

    let ru = pipeline
        .translate_existing(&approved, Some("ru"), None, &NoopObserver)
        .await
        .unwrap();
    let de = pipeline
        .translate_existing(&approved, Some("de"), None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(approved, before);
    assert_eq!(ru.language_code, "ru");
    assert_eq!(de.language_code, "de");
    assert_ne!(ru.artifact.html, de.artifact.html);
    assert_eq!(producer.call_count(), 2);
}

#[tokio::test]
async fn test_translateExisting_intoArtifactLanguage_shouldReturnItUnchanged() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer);
    let russian = ResumeArtifact::new("<p>Резюме</p>", "ru");

    let same = pipeline
        .translate_existing(&russian, Some("rus"), None, &NoopObserver)
        .await
        .unwrap();
    let none = pipeline
        .translate_existing(&russian, None, None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(same.status, OutcomeStatus::Untranslated);
    assert_eq!(same.artifact, russian);
    assert_eq!(none.language_code, "ru");
    assert_eq!(producer.call_count(), 0);
}

#[tokio::test]
async fn test_translateExisting_nonDefaultSourceIntoDefault_shouldTranslate() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer);
    let russian = ResumeArtifact::new("<p>Резюме</p>", "ru");

    let outcome = pipeline
        .translate_existing(&russian, Some("en"), None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Accepted);
    assert_eq!(outcome.language_code, "en");
    assert_eq!(producer.call_count(), 1);
}

#[tokio::test]
async fn test_translateExisting_withAlwaysFailingReview_shouldReturnBestEffort() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_fail();
    let pipeline = coordinator(&producer, &reviewer).with_max_attempts(3);
    let (observer, mut receiver) = ChannelObserver::channel();

    let outcome = pipeline
        .translate_existing(&common::sample_artifact(), Some("fr"), None, &observer)
        .await
        .unwrap();

    assert!(outcome.is_best_effort());
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.artifact.html, "<p>fr draft 3</p>");
    assert!((outcome.final_score().unwrap() - 0.55).abs() < 1e-6);

    let mut events = 0;
    while receiver.try_recv().is_ok() {
        events += 1;
    }
    assert_eq!(events, 3 * 2 + 1);
}

#[tokio::test]
async fn test_translateExisting_withZeroAttempts_shouldFailWithConfigError() {
    let producer = StubProducer::new();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer).with_max_attempts(0);

    let err = pipeline
        .translate_existing(&common::sample_artifact(), Some("ru"), None, &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn test_translateExisting_withUnavailableProducer_shouldPropagate() {
    let producer = StubProducer::unavailable();
    let reviewer = ScriptedReviewer::always_pass();
    let pipeline = coordinator(&producer, &reviewer);

    let err = pipeline
        .translate_existing(&common::sample_artifact(), Some("ru"), None, &NoopObserver)
        .await
        .unwrap_err();

    assert!(err.is_retryable_later());
}
