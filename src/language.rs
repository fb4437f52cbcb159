/*!
 * Supported output languages.
 *
 * The `LanguageRegistry` is built once at startup and then shared read-only
 * (behind an `Arc`) by every pipeline run. Codes are ISO 639-1; lookups also
 * accept ISO 639-2/T and 639-2/B aliases through `isolang`.
 */

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Sentinel code meaning "leave the resume in its current language".
pub const NO_TRANSLATION: &str = "none";

/// ISO 639-2/B codes that differ from their 639-2/T counterpart.
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// A target language for resume output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    code: String,
    english_name: String,
    native_name: String,
}

impl Language {
    pub fn new(
        code: impl Into<String>,
        english_name: impl Into<String>,
        native_name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            english_name: english_name.into(),
            native_name: native_name.into(),
        }
    }

    /// Build a language from an ISO code using the `isolang` name tables.
    pub fn from_iso(code: &str) -> Result<Self> {
        let part1 = normalize_to_part1_or_part2t(code)?;
        let iso = lookup_iso(&part1)
            .ok_or_else(|| anyhow!("Failed to get language from code: {}", part1))?;
        let english = iso.to_name();
        let native = iso.to_autonym().unwrap_or(english);
        Ok(Self::new(part1, english, capitalize(native)))
    }

    /// ISO 639-1 code, e.g. "en"
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Name in English, e.g. "Russian"
    pub fn english_name(&self) -> &str {
        &self.english_name
    }

    /// Name in the language itself, e.g. "Русский"
    pub fn native_name(&self) -> &str {
        &self.native_name
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.english_name, self.code)
    }
}

/// Immutable catalog of supported output languages with one default entry.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
    default_index: usize,
}

impl LanguageRegistry {
    /// Create a registry, rejecting duplicate codes, blank fields and a
    /// default code that is not part of `languages`.
    pub fn new(languages: Vec<Language>, default_code: &str) -> Result<Self, PipelineError> {
        if languages.is_empty() {
            return Err(PipelineError::InvalidRegistry(
                "at least one language is required".to_string(),
            ));
        }

        for (i, lang) in languages.iter().enumerate() {
            if lang.code.trim().is_empty()
                || lang.english_name.trim().is_empty()
                || lang.native_name.trim().is_empty()
            {
                return Err(PipelineError::InvalidRegistry(format!(
                    "language entry {} has an empty field",
                    i
                )));
            }
            if languages[..i]
                .iter()
                .any(|other| other.code.eq_ignore_ascii_case(&lang.code))
            {
                return Err(PipelineError::InvalidRegistry(format!(
                    "duplicate language code: {}",
                    lang.code
                )));
            }
        }

        let default_index = languages
            .iter()
            .position(|l| l.code.eq_ignore_ascii_case(default_code.trim()))
            .ok_or_else(|| {
                PipelineError::InvalidRegistry(format!(
                    "default language '{}' is not registered",
                    default_code
                ))
            })?;

        Ok(Self {
            languages,
            default_index,
        })
    }

    /// The built-in catalog: English (default), Russian, German, French, Spanish.
    pub fn builtin() -> Self {
        Self {
            languages: vec![
                Language::new("en", "English", "English"),
                Language::new("ru", "Russian", "Русский"),
                Language::new("de", "German", "Deutsch"),
                Language::new("fr", "French", "Français"),
                Language::new("es", "Spanish", "Español"),
            ],
            default_index: 0,
        }
    }

    /// Build a registry from ISO codes, taking names from `isolang`.
    /// Built-in languages followed by `extra_codes`, with `default_code`
    /// appended when it is not already one of them.
    pub fn extended(extra_codes: &[String], default_code: &str) -> Result<Self, PipelineError> {
        let mut languages = Self::builtin().languages;
        for code in extra_codes.iter().map(String::as_str).chain(std::iter::once(default_code)) {
            let known = languages.iter().any(|l| {
                l.code.eq_ignore_ascii_case(code.trim()) || language_codes_match(&l.code, code)
            });
            if !known {
                let language = Language::from_iso(code)
                    .map_err(|_| PipelineError::UnknownLanguage(code.to_string()))?;
                languages.push(language);
            }
        }

        let default_code = languages
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(default_code.trim()) || language_codes_match(&l.code, default_code))
            .map(|l| l.code.clone())
            .ok_or_else(|| PipelineError::UnknownLanguage(default_code.to_string()))?;
        Self::new(languages, &default_code)
    }

    pub fn from_codes(codes: &[&str], default_code: &str) -> Result<Self, PipelineError> {
        let languages = codes
            .iter()
            .map(|code| {
                Language::from_iso(code)
                    .map_err(|_| PipelineError::UnknownLanguage(code.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let default_code = normalize_to_part1_or_part2t(default_code)
            .map_err(|_| PipelineError::UnknownLanguage(default_code.to_string()))?;
        Self::new(languages, &default_code)
    }

    /// Look up a language by code. Aliases such as "rus" or "RU" resolve to "ru".
    pub fn get(&self, code: &str) -> Result<&Language, PipelineError> {
        let wanted = code.trim();
        if let Some(lang) = self
            .languages
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(wanted))
        {
            return Ok(lang);
        }

        self.languages
            .iter()
            .find(|l| language_codes_match(&l.code, wanted))
            .ok_or_else(|| PipelineError::UnknownLanguage(wanted.to_string()))
    }

    /// All languages in registration order.
    pub fn list(&self) -> &[Language] {
        &self.languages
    }

    /// The designated default language.
    pub fn default_language(&self) -> &Language {
        &self.languages[self.default_index]
    }

    /// Resolve an optional target code. `Ok(None)` means no translation.
    pub fn resolve_target(&self, code: Option<&str>) -> Result<Option<&Language>, PipelineError> {
        match code {
            Some(c) if !is_no_translation(c) => self.get(c).map(Some),
            _ => Ok(None),
        }
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Whether a requested code means "do not translate".
pub fn is_no_translation(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code.eq_ignore_ascii_case(NO_TRANSLATION)
}

/// Validate that a code is a known ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<()> {
    normalize_to_part2t(code).map(|_| ())
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = isolang::Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            let part2t = bibliographic_to_terminology(&normalized_code);
            if isolang::Language::from_639_3(part2t).is_some() {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible.
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists.
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = isolang::Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or(part2t))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = isolang::Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;
    Ok(lang.to_name().to_string())
}

fn bibliographic_to_terminology(code: &str) -> &str {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
        .unwrap_or(code)
}

fn lookup_iso(code: &str) -> Option<isolang::Language> {
    if code.len() == 2 {
        isolang::Language::from_639_1(code)
    } else {
        isolang::Language::from_639_3(code)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
