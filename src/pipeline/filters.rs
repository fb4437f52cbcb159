/*!
 * Upstream gating of the English draft.
 *
 * A `ResumeOptimizer` turns the user's resume into an approved artifact or
 * fails with `FilterFailure`. `GatedOptimizer` is the reference
 * implementation: a `ResumeDrafter` writes drafts and a `FilterChain` of
 * `ResumeFilter`s validates each one, feeding the validation back into the
 * next drafting round.
 *
 * Filter ordering in sequential mode: lower `priority` runs first, the
 * chain stops at the first failing filter with `priority < 100`, and
 * filters with `priority >= 100` only run when everything before passed.
 */

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::app_config::Config;
use crate::artifact::{JobPosting, ResumeArtifact, ResumeSource};
use crate::errors::PipelineError;
use crate::markup;

/// Priority from which a filter is a final check.
pub const FINAL_CHECK_PRIORITY: u32 = 100;

/// Outcome of a single filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub filter_name: String,
    pub passed: bool,
    pub score: f32,
    pub threshold: f32,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl FilterResult {
    /// Result with `passed` derived from `score >= threshold`.
    pub fn scored(filter_name: impl Into<String>, score: f32, threshold: f32) -> Self {
        Self {
            filter_name: filter_name.into(),
            passed: score >= threshold,
            score,
            threshold,
            issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Failed result standing in for a filter that errored.
    pub fn from_error(filter_name: impl Into<String>, threshold: f32, error: &PipelineError) -> Self {
        Self {
            filter_name: filter_name.into(),
            passed: false,
            score: 0.0,
            threshold,
            issues: vec![format!("Filter error: {}", error)],
            suggestions: vec!["Check filter implementation".to_string()],
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Results of one pass of the filter chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub results: Vec<FilterResult>,
}

impl ValidationResult {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Issues of failed filters, prefixed with the filter name.
    pub fn failed_issues(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .flat_map(|r| {
                let name = r.filter_name.as_str();
                if r.issues.is_empty() {
                    vec![format!("{}: score {:.2} below {:.2}", name, r.score, r.threshold)]
                } else {
                    r.issues.iter().map(|i| format!("{}: {}", name, i)).collect()
                }
            })
            .collect()
    }
}

/// A check applied to every English draft.
#[async_trait]
pub trait ResumeFilter: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first; `FINAL_CHECK_PRIORITY` and above run last.
    fn priority(&self) -> u32 {
        50
    }

    fn threshold(&self) -> f32 {
        0.5
    }

    async fn evaluate(
        &self,
        draft: &ResumeArtifact,
        job: &JobPosting,
        source: &ResumeSource,
    ) -> Result<FilterResult, PipelineError>;
}

/// Ordered set of filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn ResumeFilter>>,
    parallel: bool,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Arc<dyn ResumeFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Run every filter concurrently instead of in priority order.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn run(
        &self,
        draft: &ResumeArtifact,
        job: &JobPosting,
        source: &ResumeSource,
    ) -> Result<ValidationResult, PipelineError> {
        if self.parallel {
            Ok(self.run_parallel(draft, job, source).await)
        } else {
            self.run_sequential(draft, job, source).await
        }
    }

    async fn run_parallel(
        &self,
        draft: &ResumeArtifact,
        job: &JobPosting,
        source: &ResumeSource,
    ) -> ValidationResult {
        let start = Instant::now();
        let outcomes = join_all(self.filters.iter().map(|f| f.evaluate(draft, job, source))).await;
        debug!("All filters (parallel): {:.2}s", start.elapsed().as_secs_f64());

        let results = self
            .filters
            .iter()
            .zip(outcomes)
            .map(|(filter, outcome)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("Filter {} failed: {}", filter.name(), e);
                    FilterResult::from_error(filter.name(), filter.threshold(), &e)
                }
            })
            .collect();
        ValidationResult { results }
    }

    async fn run_sequential(
        &self,
        draft: &ResumeArtifact,
        job: &JobPosting,
        source: &ResumeSource,
    ) -> Result<ValidationResult, PipelineError> {
        let mut ordered: Vec<&Arc<dyn ResumeFilter>> = self.filters.iter().collect();
        ordered.sort_by_key(|f| f.priority());

        let mut results: Vec<FilterResult> = Vec::new();
        for filter in ordered {
            let is_final = filter.priority() >= FINAL_CHECK_PRIORITY;
            if is_final && !results.iter().all(|r| r.passed) {
                continue;
            }

            let start = Instant::now();
            let result = filter.evaluate(draft, job, source).await?;
            debug!("{}: {:.2}s", filter.name(), start.elapsed().as_secs_f64());

            let stop = !result.passed && !is_final;
            results.push(result);
            if stop {
                break;
            }
        }
        Ok(ValidationResult { results })
    }
}

/// What a drafting round knows about earlier rounds.
#[derive(Debug, Clone, Copy)]
pub struct DraftContext<'a> {
    /// 0-based drafting round
    pub iteration: u32,
    pub last_attempt: Option<&'a str>,
    pub validation: Option<&'a ValidationResult>,
}

/// Writes an English draft of the resume tailored to a job.
#[async_trait]
pub trait ResumeDrafter: Send + Sync {
    async fn draft(
        &self,
        source: &ResumeSource,
        job: &JobPosting,
        context: &DraftContext<'_>,
    ) -> Result<ResumeArtifact, PipelineError>;
}

/// Produces an approved English artifact, or fails with `FilterFailure`.
#[async_trait]
pub trait ResumeOptimizer: Send + Sync {
    async fn optimize(
        &self,
        source: &ResumeSource,
        job: &JobPosting,
    ) -> Result<ResumeArtifact, PipelineError>;
}

/// Draft, validate, repeat until the chain passes or rounds run out.
pub struct GatedOptimizer<D> {
    drafter: D,
    chain: FilterChain,
    max_iterations: u32,
}

impl<D: ResumeDrafter> GatedOptimizer<D> {
    pub fn new(drafter: D, chain: FilterChain) -> Self {
        Self {
            drafter,
            chain,
            max_iterations: 5,
        }
    }

    /// Rounds from `max_iterations`, parallel chain when `parallel_filters` is set.
    pub fn from_config(config: &Config, drafter: D, chain: FilterChain) -> Self {
        let chain = if config.parallel_filters {
            chain.parallel(true)
        } else {
            chain
        };
        Self::new(drafter, chain).with_max_iterations(config.max_iterations)
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }
}

#[async_trait]
impl<D: ResumeDrafter> ResumeOptimizer for GatedOptimizer<D> {
    async fn optimize(
        &self,
        source: &ResumeSource,
        job: &JobPosting,
    ) -> Result<ResumeArtifact, PipelineError> {
        let checksum = source.checksum();
        let mut last_attempt: Option<String> = None;
        let mut validation: Option<ValidationResult> = None;

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);
            let context = DraftContext {
                iteration,
                last_attempt: last_attempt.as_deref(),
                validation: validation.as_ref(),
            };

            let start = Instant::now();
            let mut draft = self.drafter.draft(source, job, &context).await?;
            debug!("draft_resume: {:.2}s", start.elapsed().as_secs_f64());
            if draft.source_checksum.is_empty() {
                draft.source_checksum = checksum.clone();
            }

            let result = self.chain.run(&draft, job, source).await?;
            if result.passed() {
                return Ok(draft);
            }
            last_attempt = Some(draft.html);
            validation = Some(result);
        }

        let issues = validation
            .map(|v| v.failed_issues().join("; "))
            .unwrap_or_default();
        Err(PipelineError::FilterFailure(format!(
            "no draft passed after {} iterations: {}",
            self.max_iterations, issues
        )))
    }
}

/// Rejects drafts with empty or unbalanced markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupValidator;

#[async_trait]
impl ResumeFilter for MarkupValidator {
    fn name(&self) -> &str {
        "MarkupValidator"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn threshold(&self) -> f32 {
        1.0
    }

    async fn evaluate(
        &self,
        draft: &ResumeArtifact,
        _job: &JobPosting,
        _source: &ResumeSource,
    ) -> Result<FilterResult, PipelineError> {
        if draft.is_blank() {
            return Ok(FilterResult::scored(self.name(), 0.0, 1.0)
                .with_issue("Resume body is empty")
                .with_suggestion("Produce the full resume body"));
        }
        if !markup::is_balanced(&draft.html) {
            return Ok(FilterResult::scored(self.name(), 0.0, 1.0)
                .with_issue("HTML tags are not balanced")
                .with_suggestion("Close every opened tag in order"));
        }
        Ok(FilterResult::scored(self.name(), 1.0, 1.0))
    }
}

/// Share of job keywords present in the draft's visible text.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCoverage {
    threshold: f32,
}

impl KeywordCoverage {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for KeywordCoverage {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl ResumeFilter for KeywordCoverage {
    fn name(&self) -> &str {
        "KeywordCoverage"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    async fn evaluate(
        &self,
        draft: &ResumeArtifact,
        job: &JobPosting,
        _source: &ResumeSource,
    ) -> Result<FilterResult, PipelineError> {
        if job.keywords.is_empty() {
            return Ok(FilterResult::scored(self.name(), 1.0, self.threshold));
        }

        let text = markup::visible_text(&draft.html).to_lowercase();
        let missing: Vec<&str> = job
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|k| !text.contains(&k.to_lowercase()))
            .collect();
        let score = 1.0 - missing.len() as f32 / job.keywords.len() as f32;

        let mut result = FilterResult::scored(self.name(), score, self.threshold);
        if !missing.is_empty() {
            result = result
                .with_issue(format!("Missing keywords: {}", missing.join(", ")))
                .with_suggestion("Mention the missing keywords where the experience supports them");
        }
        Ok(result)
    }
}
