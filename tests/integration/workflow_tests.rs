/*!
 * End-to-end workflow tests: translate, render and store.
 */

use std::sync::Arc;
use std::time::Duration;

use cvlingo::app_config::{Config, TranslationProvider};
use cvlingo::errors::PipelineError;
use cvlingo::language::LanguageRegistry;
use cvlingo::artifact::ResumeArtifact;
use cvlingo::pipeline::{DocumentRenderer, HtmlRenderer, PipelineCoordinator};
use cvlingo::providers::mock::{MockProvider, MockReply};
use cvlingo::storage::PdfStorage;
use cvlingo::translation::NoopObserver;

use crate::common::{self, stubs::{ScriptedReviewer, StubProducer}};

fn stub_pipeline(storage: PdfStorage) -> (PipelineCoordinator, StubProducer) {
    let producer = StubProducer::new();
    let pipeline = PipelineCoordinator::new(
        Arc::new(LanguageRegistry::builtin()),
        Arc::new(producer.clone()),
        Arc::new(ScriptedReviewer::always_pass()),
    )
    .with_renderer(Arc::new(HtmlRenderer))
    .with_store(Arc::new(storage));
    (pipeline, producer)
}

#[tokio::test]
async fn test_publish_perLanguage_shouldStoreSideBySide() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let (pipeline, _) = stub_pipeline(PdfStorage::new(dir.path()).unwrap());
    let approved = common::sample_artifact();

    let english = pipeline
        .translate_existing(&approved, None, None, &NoopObserver)
        .await
        .unwrap();
    let russian = pipeline
        .translate_existing(&approved, Some("ru"), None, &NoopObserver)
        .await
        .unwrap();

    let en_path = pipeline.publish(&english, "jane_doe_acme_backend").await.unwrap();
    let ru_path = pipeline.publish(&russian, "jane_doe_acme_backend").await.unwrap();

    assert_eq!(en_path.file_name().unwrap(), "jane_doe_acme_backend_en.pdf");
    assert_eq!(ru_path.file_name().unwrap(), "jane_doe_acme_backend_ru.pdf");

    let ru_document = std::fs::read_to_string(&ru_path).unwrap();
    assert!(ru_document.contains("<html lang=\"ru\">"));
    assert!(ru_document.contains("<p>ru draft 1</p>"));
    let en_document = std::fs::read_to_string(&en_path).unwrap();
    assert!(en_document.contains("Jane Doe"));
}

#[tokio::test]
async fn test_publish_withoutRenderer_shouldFailWithConfigError() {
    let pipeline = PipelineCoordinator::new(
        Arc::new(LanguageRegistry::builtin()),
        Arc::new(StubProducer::new()),
        Arc::new(ScriptedReviewer::always_pass()),
    );
    let outcome = pipeline
        .translate_existing(&common::sample_artifact(), None, None, &NoopObserver)
        .await
        .unwrap();

    let err = pipeline.publish(&outcome, "acme").await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn test_fromConfig_withMockProvider_shouldTranslateAndStore() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.translation.common.retry_count = 0;
    config.output_dir = dir.path().join("out");

    let translated = common::SAMPLE_RESUME_HTML.replace("Experience", "Опыт работы");
    let provider = MockProvider::scripted(vec![
        MockReply::Text(serde_json::json!({ "html": translated, "changes": [] }).to_string()),
        MockReply::Text(
            serde_json::json!({
                "passed": true,
                "score": 0.93,
                "issues": [],
                "suggestions": [],
                "reasoning": "Natural and complete"
            })
            .to_string(),
        ),
    ]);

    let pipeline =
        PipelineCoordinator::from_config(&config, Arc::new(LanguageRegistry::builtin()), Arc::new(provider.clone()))
            .unwrap()
            .with_renderer(Arc::new(HtmlRenderer));

    let outcome = pipeline
        .translate_existing(&common::sample_artifact(), Some("ru"), Some(&common::sample_job()), &NoopObserver)
        .await
        .unwrap();
    let path = pipeline.publish(&outcome, "acme_backend").await.unwrap();

    assert!(!outcome.is_best_effort());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(provider.call_count(), 2);
    assert!(config.output_dir.is_dir());
    assert_eq!(path.file_name().unwrap(), "acme_backend_ru.pdf");
    assert!(std::fs::read_to_string(&path).unwrap().contains("Опыт работы"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_publish_withCommandRenderer_shouldStoreProgramOutput() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.output_dir = dir.path().to_path_buf();
    config.render_command = vec!["cat".to_string()];

    let pipeline = PipelineCoordinator::from_config(
        &config,
        Arc::new(LanguageRegistry::builtin()),
        Arc::new(MockProvider::failing()),
    )
    .unwrap();

    let outcome = pipeline
        .translate_existing(&common::sample_artifact(), Some("en"), None, &NoopObserver)
        .await
        .unwrap();
    let path = pipeline.publish(&outcome, "acme").await.unwrap();

    assert_eq!(path.file_name().unwrap(), "acme_en.pdf");
    assert!(std::fs::read_to_string(&path).unwrap().contains("<html lang=\"en\">"));
}

#[test]
fn test_htmlRenderer_shouldProduceCompleteDocument() {
    let artifact = ResumeArtifact::new("<p>Bonjour</p>", "fr");

    let result = tokio_test::block_on(async { HtmlRenderer.render(&artifact).await });

    let document = String::from_utf8(result.unwrap().to_vec()).unwrap();
    assert!(document.starts_with("<!DOCTYPE html>"));
    assert!(document.contains("<html lang=\"fr\">"));
    assert!(document.contains("<p>Bonjour</p>"));
}

#[tokio::test]
async fn test_fromConfig_withGlossarySettings_shouldReachTranslatorAndReviewer() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.translation.common.retry_count = 0;
    config.output_dir = dir.path().to_path_buf();
    config.translation.common.preserved_terms = vec!["Acme Cloud".to_string()];
    config
        .translation
        .common
        .term_overrides
        .insert("on-call".to_string(), "дежурство".to_string());

    let provider = MockProvider::scripted(vec![
        MockReply::Text(
            serde_json::json!({ "html": "<p>Дежурство для облачной платформы</p>", "changes": [] })
                .to_string(),
        ),
        MockReply::Text(
            serde_json::json!({
                "passed": true,
                "score": 0.9,
                "issues": [],
                "suggestions": [],
                "reasoning": "Reads well"
            })
            .to_string(),
        ),
    ]);
    let pipeline =
        PipelineCoordinator::from_config(&config, Arc::new(LanguageRegistry::builtin()), Arc::new(provider.clone()))
            .unwrap();
    let source = ResumeArtifact::new("<p>Led on-call rotation for Acme Cloud</p>", "en");

    let outcome = pipeline
        .translate_existing(&source, Some("ru"), None, &NoopObserver)
        .await
        .unwrap();

    let translate_prompt = &provider.requests()[0].prompt;
    assert!(translate_prompt.contains("Acme Cloud"));
    assert!(translate_prompt.contains("Translate \"on-call\" as \"дежурство\""));

    let verdict = &outcome.history.last().unwrap().verdict;
    assert!(verdict.passed);
    assert!(verdict
        .issues
        .iter()
        .any(|issue| issue.description.contains("'Acme Cloud' from the original is missing")));
}

#[tokio::test]
async fn test_translateExisting_whenAbandoned_shouldIssueNoFurtherCalls() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.translation.common.retry_count = 0;
    config.output_dir = dir.path().to_path_buf();
    let provider = MockProvider::slow(5_000);
    let pipeline =
        PipelineCoordinator::from_config(&config, Arc::new(LanguageRegistry::builtin()), Arc::new(provider.clone()))
            .unwrap();
    let approved = common::sample_artifact();

    let run = pipeline.translate_existing(&approved, Some("ru"), None, &NoopObserver);
    let result = tokio::time::timeout(Duration::from_millis(50), run).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(result.is_err());
    assert_eq!(provider.call_count(), 1);
}
