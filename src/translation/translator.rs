/*!
 * Draft Producer: turns a source artifact into a candidate in the target
 * language, optionally revising a previous candidate with reviewer feedback.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::artifact::{JobPosting, ResumeArtifact};
use crate::errors::{PipelineError, ProviderError};
use crate::language::Language;
use crate::markup::{self, DEFAULT_PRESERVED_TERMS};
use crate::providers::{complete_with_backoff, parse_json_response, BackoffPolicy, CompletionRequest, Provider};
use crate::translation::prompts::TranslationPromptBuilder;

/// Everything a producer or reviewer needs to know about one translation.
#[derive(Debug, Clone, Copy)]
pub struct TranslationTask<'a> {
    /// Approved artifact to translate, never modified
    pub source: &'a ResumeArtifact,
    pub target: &'a Language,
    /// Job posting for field-specific terminology
    pub job: Option<&'a JobPosting>,
}

impl<'a> TranslationTask<'a> {
    pub fn new(source: &'a ResumeArtifact, target: &'a Language) -> Self {
        Self {
            source,
            target,
            job: None,
        }
    }

    pub fn with_job(mut self, job: &'a JobPosting) -> Self {
        self.job = Some(job);
        self
    }
}

/// What the producer gets back after a failed review.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftFeedback {
    /// Markup of the candidate that failed review
    pub previous_html: String,
    /// Reviewer feedback, `"Issues: ...\nSuggestions: ..."`
    pub notes: String,
}

impl DraftFeedback {
    pub fn new(previous_html: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            previous_html: previous_html.into(),
            notes: notes.into(),
        }
    }
}

/// Produces a candidate artifact in the task's target language.
#[async_trait]
pub trait DraftProducer: Send + Sync {
    async fn produce(
        &self,
        task: &TranslationTask<'_>,
        feedback: Option<&DraftFeedback>,
    ) -> Result<ResumeArtifact, PipelineError>;
}

/// Terms that must stay untranslated and fixed term translations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glossary {
    pub preserved: Vec<String>,
    /// source term -> required translation
    pub overrides: BTreeMap<String, String>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preserve(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        if !self.preserved.contains(&term) {
            self.preserved.push(term);
        }
        self
    }

    pub fn with_override(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.overrides.insert(source.into(), target.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.preserved.is_empty() && self.overrides.is_empty()
    }

    /// This glossary plus the protected terms found in `html`.
    pub fn for_source(&self, html: &str) -> Self {
        let known: Vec<&str> = DEFAULT_PRESERVED_TERMS
            .iter()
            .copied()
            .chain(self.preserved.iter().map(String::as_str))
            .collect();

        let mut glossary = Self {
            preserved: Vec::new(),
            overrides: self.overrides.clone(),
        };
        for term in markup::protected_terms(html, &known) {
            glossary = glossary.preserve(term);
        }
        glossary
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.preserved.is_empty() {
            out.push_str(&format!("- Keep unchanged: {}\n", self.preserved.join(", ")));
        }
        for (source, target) in &self.overrides {
            out.push_str(&format!("- Translate \"{}\" as \"{}\"\n", source, target));
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct TranslationReply {
    html: String,
    #[serde(default)]
    changes: Vec<String>,
}

/// Producer backed by a generation service.
#[derive(Debug, Clone)]
pub struct LlmTranslator {
    provider: Arc<dyn Provider>,
    glossary: Glossary,
    temperature: f32,
    max_tokens: u32,
    backoff: BackoffPolicy,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            glossary: Glossary::default(),
            temperature: 0.3,
            max_tokens: 8192,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = glossary;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl DraftProducer for LlmTranslator {
    async fn produce(
        &self,
        task: &TranslationTask<'_>,
        feedback: Option<&DraftFeedback>,
    ) -> Result<ResumeArtifact, PipelineError> {
        let glossary = self.glossary.for_source(&task.source.html);
        let (system, prompt) = TranslationPromptBuilder::new(task)
            .with_glossary(&glossary)
            .with_feedback(feedback)
            .build();

        let request = CompletionRequest::new(system, prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let response = complete_with_backoff(self.provider.as_ref(), request, self.backoff)
            .await
            .map_err(PipelineError::from_generation)?;

        let reply: TranslationReply = parse_json_response(&response.text).map_err(|e| match e {
            ProviderError::ParseError(msg) => {
                PipelineError::GenerationRejected(format!("unparseable translator output: {}", msg))
            }
            other => PipelineError::from_generation(other),
        })?;

        if reply.html.trim().is_empty() {
            return Err(PipelineError::GenerationRejected(
                "translator returned an empty body".to_string(),
            ));
        }

        debug!(
            "Translation to {} produced: {} chars, {} translation decisions",
            task.target.code(),
            reply.html.len(),
            reply.changes.len()
        );

        Ok(task.source.derive(reply.html, task.target.code(), reply.changes))
    }
}
