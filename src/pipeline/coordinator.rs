/*!
 * Optimize-then-translate coordination.
 *
 * `PipelineCoordinator::run` gates the English draft through the upstream
 * optimizer, then translates it when a different target language is
 * requested. `translate_existing` skips the upstream stage for an artifact
 * that was already approved.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};

use crate::app_config::Config;
use crate::artifact::{JobPosting, ResumeArtifact, ResumeSource};
use crate::errors::PipelineError;
use crate::language::{language_codes_match, Language, LanguageRegistry};
use crate::markup::DEFAULT_PRESERVED_TERMS;
use crate::pipeline::filters::ResumeOptimizer;
use crate::pipeline::render::{CommandRenderer, DocumentRenderer};
use crate::providers::Provider;
use crate::storage::{DocumentStore, PdfStorage};
use crate::translation::{
    AttemptRecord, DraftProducer, Glossary, LlmReviewer, LlmTranslator, QualityReviewer, RetryController,
    StatusObserver, TranslationTask,
};

/// How the returned artifact came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// No translation was needed, the source artifact is returned as is
    Untranslated,
    /// A candidate passed review
    Accepted,
    /// No candidate passed; the last one is returned as best effort
    Exhausted,
}

/// Final artifact plus the metadata needed for naming and rendering.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub artifact: ResumeArtifact,
    pub language_code: String,
    pub attempts: u32,
    pub status: OutcomeStatus,
    pub history: Vec<AttemptRecord>,
}

impl PipelineOutcome {
    fn untranslated(artifact: ResumeArtifact) -> Self {
        Self {
            language_code: artifact.language_code.clone(),
            artifact,
            attempts: 0,
            status: OutcomeStatus::Untranslated,
            history: Vec::new(),
        }
    }

    /// True when the artifact was translated but never passed review.
    pub fn is_best_effort(&self) -> bool {
        self.status == OutcomeStatus::Exhausted
    }

    pub fn is_translated(&self) -> bool {
        self.status != OutcomeStatus::Untranslated
    }

    /// Score of the last review, if any review happened.
    pub fn final_score(&self) -> Option<f32> {
        self.history.last().map(|r| r.verdict.score)
    }
}

/// Runs the optimize-then-translate pipeline.
pub struct PipelineCoordinator {
    registry: Arc<LanguageRegistry>,
    optimizer: Option<Arc<dyn ResumeOptimizer>>,
    producer: Arc<dyn DraftProducer>,
    reviewer: Arc<dyn QualityReviewer>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    store: Option<Arc<dyn DocumentStore>>,
    max_attempts: u32,
}

impl PipelineCoordinator {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        producer: Arc<dyn DraftProducer>,
        reviewer: Arc<dyn QualityReviewer>,
    ) -> Self {
        Self {
            registry,
            optimizer: None,
            producer,
            reviewer,
            renderer: None,
            store: None,
            max_attempts: 2,
        }
    }

    /// Wire the LLM translator and reviewer, the command renderer and the
    /// PDF storage from configuration.
    pub fn from_config(
        config: &Config,
        registry: Arc<LanguageRegistry>,
        provider: Arc<dyn Provider>,
    ) -> Result<Self> {
        let common = &config.translation.common;
        let backoff = config.translation.backoff_policy();

        let glossary = common
            .term_overrides
            .iter()
            .fold(Glossary::new(), |glossary, (source, target)| {
                glossary.with_override(source.clone(), target.clone())
            });
        let glossary = common
            .preserved_terms
            .iter()
            .fold(glossary, |glossary, term| glossary.preserve(term.clone()));
        let reviewed_terms: Vec<String> = DEFAULT_PRESERVED_TERMS
            .iter()
            .map(|t| t.to_string())
            .chain(common.preserved_terms.iter().cloned())
            .collect();

        let translator = LlmTranslator::new(Arc::clone(&provider))
            .with_glossary(glossary)
            .with_temperature(common.temperature)
            .with_max_tokens(common.max_tokens)
            .with_backoff(backoff);
        let reviewer = LlmReviewer::new(provider)
            .with_preserved_terms(reviewed_terms)
            .with_threshold(config.pass_threshold)
            .with_temperature(common.review_temperature)
            .with_max_tokens(common.max_tokens)
            .with_backoff(backoff);

        let renderer = CommandRenderer::from_command(&config.render_command)?;
        let store = PdfStorage::new(&config.output_dir)?;

        Ok(Self::new(registry, Arc::new(translator), Arc::new(reviewer))
            .with_renderer(Arc::new(renderer))
            .with_store(Arc::new(store))
            .with_max_attempts(config.translation_max_iterations))
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn ResumeOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Optimize `source` for `job`, then translate into `target` if needed.
    ///
    /// An unknown target fails before the optimizer runs. A target of
    /// `None`, `"none"` or the default language returns the approved
    /// English artifact without entering the retry loop.
    pub async fn run(
        &self,
        source: &ResumeSource,
        job: &JobPosting,
        target: Option<&str>,
        observer: &dyn StatusObserver,
    ) -> Result<PipelineOutcome, PipelineError> {
        let target = self.registry.resolve_target(target)?;
        let optimizer = self.optimizer.as_ref().ok_or_else(|| {
            PipelineError::Config("no resume optimizer configured".to_string())
        })?;

        info!("Optimizing resume for {} at {}", job.title, job.company);
        let start = Instant::now();
        let mut approved = optimizer.optimize(source, job).await?;
        debug!("optimize_resume: {:.2}s", start.elapsed().as_secs_f64());

        let default = self.registry.default_language();
        if approved.language_code.trim().is_empty() {
            approved.language_code = default.code().to_string();
        }

        match target {
            Some(language) if !language_codes_match(language.code(), default.code()) => {
                self.translate(&approved, language, Some(job), observer).await
            }
            _ => Ok(PipelineOutcome::untranslated(approved)),
        }
    }

    /// Translate an already approved artifact. The artifact is only read,
    /// so the same one can be translated into several languages in turn.
    pub async fn translate_existing(
        &self,
        artifact: &ResumeArtifact,
        target: Option<&str>,
        job: Option<&JobPosting>,
        observer: &dyn StatusObserver,
    ) -> Result<PipelineOutcome, PipelineError> {
        match self.registry.resolve_target(target)? {
            Some(language) => self.translate(artifact, language, job, observer).await,
            None => Ok(PipelineOutcome::untranslated(artifact.clone())),
        }
    }

    async fn translate(
        &self,
        artifact: &ResumeArtifact,
        target: &Language,
        job: Option<&JobPosting>,
        observer: &dyn StatusObserver,
    ) -> Result<PipelineOutcome, PipelineError> {
        if language_codes_match(target.code(), &artifact.language_code)
            || target.code().eq_ignore_ascii_case(&artifact.language_code)
        {
            debug!("Artifact is already in {}, skipping translation", target.code());
            return Ok(PipelineOutcome::untranslated(artifact.clone()));
        }

        let controller =
            RetryController::new(self.producer.as_ref(), self.reviewer.as_ref(), self.max_attempts)?;
        let mut task = TranslationTask::new(artifact, target);
        if let Some(job) = job {
            task = task.with_job(job);
        }

        info!("Translating resume to {}", target);
        let start = Instant::now();
        let outcome = controller.run(&task, observer).await?;
        debug!(
            "translate_and_review ({} attempts): {:.2}s",
            outcome.attempts(),
            start.elapsed().as_secs_f64()
        );

        let status = if outcome.reviewed_pass {
            OutcomeStatus::Accepted
        } else {
            warn!(
                "Returning best-effort {} translation after {} attempts",
                target.code(),
                outcome.attempts()
            );
            OutcomeStatus::Exhausted
        };

        Ok(PipelineOutcome {
            language_code: target.code().to_string(),
            attempts: outcome.attempts(),
            status,
            artifact: outcome.artifact,
            history: outcome.state.history,
        })
    }

    /// Render the outcome and store it as `{base_name}_{code}.pdf`.
    pub async fn publish(
        &self,
        outcome: &PipelineOutcome,
        base_name: &str,
    ) -> Result<PathBuf, PipelineError> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| PipelineError::Config("no document renderer configured".to_string()))?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| PipelineError::Config("no document store configured".to_string()))?;

        let start = Instant::now();
        let document = renderer.render(&outcome.artifact).await?;
        debug!("render_pdf: {:.2}s", start.elapsed().as_secs_f64());

        let path = store.store(&document, base_name, Some(&outcome.language_code))?;
        info!("Saved {}", path.display());
        Ok(path)
    }
}
