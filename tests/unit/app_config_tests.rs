/*!
 * Tests for configuration defaults, overrides and persistence
 */

use cvlingo::app_config::{Config, LogLevel, TranslationProvider};
use std::collections::HashMap;

use crate::common;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_shouldUseDocumentedValues() {
    let config = Config::default();

    assert_eq!(config.default_language, "en");
    assert_eq!(config.translation_max_iterations, 2);
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(!config.parallel_filters);
}

#[test]
fn test_fromLookup_withBlankValues_shouldKeepDefaults() {
    let config = Config::from_lookup(lookup(&[
        ("DEFAULT_LANGUAGE", "   "),
        ("TRANSLATION_MAX_ITERATIONS", ""),
    ]))
    .unwrap();

    assert_eq!(config.default_language, "en");
    assert_eq!(config.translation_max_iterations, 2);
}

#[test]
fn test_fromLookup_withProviderOverride_shouldSwitchProvider() {
    let config = Config::from_lookup(lookup(&[
        ("TRANSLATION_PROVIDER", "OpenAI"),
        ("OPENAI_API_KEY", "sk-openai"),
    ]))
    .unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_api_key(), "sk-openai");
    assert!(config.validate().is_ok());
}

#[test]
fn test_fromLookup_withUnknownProvider_shouldFail() {
    assert!(Config::from_lookup(lookup(&[("TRANSLATION_PROVIDER", "ollama")])).is_err());
}

#[test]
fn test_validate_withInvalidDefaultLanguage_shouldFail() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.default_language = "zz".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withInvalidExtraLanguage_shouldFail() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.extra_languages = vec!["it".to_string(), "zz".to_string()];

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("extra_languages"));
}

#[test]
fn test_parse_withGlossarySettings_shouldLoadThem() {
    let config: Config = serde_json::from_str(
        r#"{"extra_languages":["it"],"translation":{"common":{"preserved_terms":["Acme Cloud"],"term_overrides":{"on-call":"дежурство"}}}}"#,
    )
    .unwrap();

    assert_eq!(config.extra_languages, vec!["it"]);
    assert_eq!(config.translation.common.preserved_terms, vec!["Acme Cloud"]);
    assert_eq!(config.translation.common.term_overrides["on-call"], "дежурство");
}

#[test]
fn test_validate_withThresholdOutOfRange_shouldFail() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.pass_threshold = 1.5;

    assert!(config.validate().is_err());
}

#[test]
fn test_saveThenParse_shouldPreserveSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let mut config = Config::default();
    config.default_language = "ru".to_string();
    config.translation_max_iterations = 3;
    config.translation.provider = TranslationProvider::LMStudio;
    config.save(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: Config = serde_json::from_str(&content).unwrap();

    assert_eq!(parsed.default_language, "ru");
    assert_eq!(parsed.translation_max_iterations, 3);
    assert_eq!(parsed.translation.provider, TranslationProvider::LMStudio);
    assert_eq!(parsed.translation.get_model(), config.translation.get_model());
}

#[test]
fn test_load_withMalformedFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_backoffPolicy_shouldFollowCommonSettings() {
    let mut config = Config::default();
    config.translation.common.retry_count = 4;
    config.translation.common.retry_backoff_ms = 250;

    let policy = config.translation.backoff_policy();
    assert_eq!(policy.retry_count, 4);
    assert_eq!(policy.backoff_ms, 250);
}
