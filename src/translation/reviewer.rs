/*!
 * Quality Reviewer: judges a candidate translation against its source.
 *
 * `LlmReviewer` combines local markup checks with a judgment service:
 * - an empty candidate fails immediately without a service call
 * - a changed tag skeleton is a blocking structure issue
 * - protected terms dropped from the candidate are terminology issues
 */

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::artifact::ResumeArtifact;
use crate::errors::PipelineError;
use crate::markup::{self, DEFAULT_PRESERVED_TERMS};
use crate::providers::{complete_with_backoff, parse_json_response, BackoffPolicy, CompletionRequest, Provider};
use crate::translation::prompts::ReviewPromptBuilder;
use crate::translation::translator::TranslationTask;
use crate::translation::verdict::{IssueCategory, ReviewIssue, ReviewVerdict};

/// Default minimum score for a passing review
pub const DEFAULT_PASS_THRESHOLD: f32 = 0.8;

/// Judges a candidate artifact for the task's target language.
#[async_trait]
pub trait QualityReviewer: Send + Sync {
    async fn review(
        &self,
        task: &TranslationTask<'_>,
        candidate: &ResumeArtifact,
    ) -> Result<ReviewVerdict, PipelineError>;
}

/// Reviewer backed by a judgment service.
#[derive(Debug, Clone)]
pub struct LlmReviewer {
    provider: Arc<dyn Provider>,
    pass_threshold: f32,
    preserved_terms: Vec<String>,
    temperature: f32,
    max_tokens: u32,
    backoff: BackoffPolicy,
}

impl LlmReviewer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            preserved_terms: DEFAULT_PRESERVED_TERMS.iter().map(|t| t.to_string()).collect(),
            temperature: 0.1,
            max_tokens: 4096,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_threshold(mut self, pass_threshold: f32) -> Self {
        self.pass_threshold = pass_threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_preserved_terms(mut self, terms: Vec<String>) -> Self {
        self.preserved_terms = terms;
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

    pub fn pass_threshold(&self) -> f32 {
        self.pass_threshold
    }

    /// Issues detectable without the service.
    fn local_findings(&self, source: &ResumeArtifact, candidate: &ResumeArtifact) -> Vec<ReviewIssue> {
        let mut findings = Vec::new();

        let report = markup::compare_structure(&source.html, &candidate.html);
        if !report.matches {
            findings.push(ReviewIssue::new(
                IssueCategory::Structure,
                report
                    .detail
                    .unwrap_or_else(|| "HTML structure differs from the original".to_string()),
            ));
        }

        let known: Vec<&str> = self.preserved_terms.iter().map(String::as_str).collect();
        for term in markup::missing_terms(&source.html, &candidate.html, &known) {
            findings.push(ReviewIssue::new(
                IssueCategory::Terminology,
                format!("'{}' from the original is missing; keep it unchanged", term),
            ));
        }

        findings
    }
}

#[async_trait]
impl QualityReviewer for LlmReviewer {
    async fn review(
        &self,
        task: &TranslationTask<'_>,
        candidate: &ResumeArtifact,
    ) -> Result<ReviewVerdict, PipelineError> {
        if candidate.is_blank() {
            debug!("Candidate for {} is empty, failing without review", task.target.code());
            return Ok(ReviewVerdict::fail(
                0.0,
                vec![ReviewIssue::new(
                    IssueCategory::Completeness,
                    "Translated resume body is empty",
                )],
            )
            .with_reasoning("The candidate has no visible text"));
        }

        let findings = self.local_findings(task.source, candidate);

        let (system, prompt) = ReviewPromptBuilder::new(task, candidate)
            .with_threshold(self.pass_threshold)
            .build();
        let request = CompletionRequest::new(system, prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let response = complete_with_backoff(self.provider.as_ref(), request, self.backoff)
            .await
            .map_err(PipelineError::from_review)?;
        let service: ReviewVerdict =
            parse_json_response(&response.text).map_err(PipelineError::from_review)?;

        let mut issues = findings;
        issues.extend(service.issues);
        let verdict = ReviewVerdict::new(
            service.passed,
            service.score,
            issues,
            service.suggestions,
            service.reasoning,
        );
        let passed =
            verdict.passed && verdict.score >= self.pass_threshold && !verdict.has_blocking_issue();

        debug!(
            "Review of {} translation: score={:.2}, passed={}, issues={}",
            task.target.code(),
            verdict.score,
            passed,
            verdict.issues.len()
        );

        Ok(ReviewVerdict { passed, ..verdict })
    }
}
