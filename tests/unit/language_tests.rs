/*!
 * Tests for the language registry
 */

use cvlingo::errors::PipelineError;
use cvlingo::language::{language_codes_match, Language, LanguageRegistry};

#[test]
fn test_registry_lookupOfEveryListedCode_shouldReturnSameEntry() {
    let registry = LanguageRegistry::builtin();

    for language in registry.list() {
        let found = registry.get(language.code()).unwrap();
        assert_eq!(found, language);
    }
}

#[test]
fn test_registry_shouldHaveExactlyOneDefault() {
    let registry = LanguageRegistry::builtin();
    let default = registry.default_language();

    let matches = registry.list().iter().filter(|l| *l == default).count();
    assert_eq!(matches, 1);
    assert_eq!(default.code(), "en");
}

#[test]
fn test_builtin_shouldCoverEnglishAndRussian() {
    let registry = LanguageRegistry::builtin();

    let ru = registry.get("ru").unwrap();
    assert_eq!(ru.english_name(), "Russian");
    assert_eq!(ru.native_name(), "Русский");
    assert!(registry.get("en").is_ok());
}

#[test]
fn test_get_withIsoAlias_shouldResolveToRegisteredCode() {
    let registry = LanguageRegistry::builtin();

    assert_eq!(registry.get("RU").unwrap().code(), "ru");
    assert_eq!(registry.get("rus").unwrap().code(), "ru");
    assert_eq!(registry.get("deu").unwrap().code(), "de");
}

#[test]
fn test_get_withUnregisteredCode_shouldFailWithUnknownLanguage() {
    let registry = LanguageRegistry::builtin();

    let err = registry.get("xx").unwrap_err();
    assert!(matches!(err, PipelineError::UnknownLanguage(code) if code == "xx"));
    assert!(matches!(registry.get("ja"), Err(PipelineError::UnknownLanguage(_))));
}

#[test]
fn test_new_withDuplicateCodes_shouldFail() {
    let result = LanguageRegistry::new(
        vec![
            Language::new("en", "English", "English"),
            Language::new("EN", "English", "English"),
        ],
        "en",
    );
    assert!(matches!(result, Err(PipelineError::InvalidRegistry(_))));
}

#[test]
fn test_new_withUnregisteredDefault_shouldFail() {
    let result = LanguageRegistry::new(vec![Language::new("ru", "Russian", "Русский")], "en");
    assert!(matches!(result, Err(PipelineError::InvalidRegistry(_))));
}

#[test]
fn test_new_withBlankNativeName_shouldFail() {
    let result = LanguageRegistry::new(vec![Language::new("en", "English", "  ")], "en");
    assert!(result.is_err());
}

#[test]
fn test_fromCodes_shouldTakeNamesFromIsoTables() {
    let registry = LanguageRegistry::from_codes(&["en", "fr", "jpn"], "eng").unwrap();

    assert_eq!(registry.default_language().code(), "en");
    assert_eq!(registry.get("fr").unwrap().english_name(), "French");
    assert_eq!(registry.get("ja").unwrap().english_name(), "Japanese");
}

#[test]
fn test_resolveTarget_withNoneMarkers_shouldMeanNoTranslation() {
    let registry = LanguageRegistry::builtin();

    assert!(registry.resolve_target(None).unwrap().is_none());
    assert!(registry.resolve_target(Some("")).unwrap().is_none());
    assert!(registry.resolve_target(Some("none")).unwrap().is_none());
    assert_eq!(registry.resolve_target(Some("ru")).unwrap().unwrap().code(), "ru");
    assert!(registry.resolve_target(Some("zz")).is_err());
}

#[test]
fn test_languageCodesMatch_acrossIsoParts_shouldMatch() {
    assert!(language_codes_match("ru", "rus"));
    assert!(language_codes_match("de", "ger"));
    assert!(!language_codes_match("en", "ru"));
}

#[test]
fn test_extended_withConfiguredLanguages_shouldListThemAndUseDefault() {
    let registry = LanguageRegistry::extended(&["it".to_string()], "pl").unwrap();

    let codes: Vec<&str> = registry.list().iter().map(|l| l.code()).collect();
    assert_eq!(codes, vec!["en", "ru", "de", "fr", "es", "it", "pl"]);
    assert_eq!(registry.default_language().code(), "pl");
    assert_eq!(registry.get("it").unwrap().english_name(), "Italian");
}

#[test]
fn test_extended_withAliasOfBuiltin_shouldNotDuplicate() {
    let registry = LanguageRegistry::extended(&["rus".to_string()], "eng").unwrap();

    assert_eq!(registry.list().len(), LanguageRegistry::builtin().list().len());
    assert_eq!(registry.default_language().code(), "en");
}

#[test]
fn test_extended_withInvalidCode_shouldFailWithUnknownLanguage() {
    let err = LanguageRegistry::extended(&["zz".to_string()], "en").unwrap_err();

    assert!(matches!(err, PipelineError::UnknownLanguage(code) if code == "zz"));
}
