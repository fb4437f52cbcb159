/*!
 * Translate-review retry loop.
 *
 * `RetryController` drives one run through
 * `Pending -> Producing -> Reviewing -> {Accepted | Retrying | Exhausted}`.
 * All loop state lives in a local `RetryState` value that is handed back
 * with the outcome, so attempt count, last feedback and history can be
 * inspected after the run.
 *
 * Observers receive a `TransitionEvent` on entering `Producing`, on
 * entering `Reviewing` and on the terminal state. `Retrying` is recorded in
 * the state but not emitted; the next `Producing` event carries the verdict
 * that caused the retry.
 */

use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::artifact::ResumeArtifact;
use crate::errors::PipelineError;
use crate::language::Language;
use crate::translation::reviewer::QualityReviewer;
use crate::translation::translator::{DraftFeedback, DraftProducer, TranslationTask};
use crate::translation::verdict::ReviewVerdict;

/// Phase of the retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryPhase {
    Pending,
    Producing,
    Reviewing,
    Accepted,
    Retrying,
    Exhausted,
}

impl RetryPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }
}

/// One produce-then-review round.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub candidate: ResumeArtifact,
    pub verdict: ReviewVerdict,
}

/// Loop state of a single controller run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    /// 1-based number of the current attempt
    pub attempt: u32,
    pub max_attempts: u32,
    pub phase: RetryPhase,
    pub last_feedback: Option<DraftFeedback>,
    pub history: Vec<AttemptRecord>,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts,
            phase: RetryPhase::Pending,
            last_feedback: None,
            history: Vec::new(),
        }
    }

    pub fn last_verdict(&self) -> Option<&ReviewVerdict> {
        self.history.last().map(|r| &r.verdict)
    }
}

/// Notification of a state machine transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub attempt: u32,
    pub max_attempts: u32,
    pub phase: RetryPhase,
    pub target: Language,
    /// Latest verdict: the failing one on a retry's `Producing` event, the
    /// final one on the terminal event
    pub verdict: Option<ReviewVerdict>,
}

impl TransitionEvent {
    /// Human readable progress line.
    pub fn status_message(&self) -> String {
        let language = self.target.english_name();
        match self.phase {
            RetryPhase::Producing if self.attempt > 1 => format!(
                "Refining {} translation (attempt {})...",
                language, self.attempt
            ),
            RetryPhase::Producing | RetryPhase::Pending => format!("Translating to {}...", language),
            RetryPhase::Reviewing => format!("Reviewing {} translation...", language),
            RetryPhase::Retrying => format!("Retrying {} translation...", language),
            RetryPhase::Accepted => "Translation complete".to_string(),
            RetryPhase::Exhausted => format!(
                "Translation complete (best effort after {} attempts)",
                self.attempt
            ),
        }
    }
}

/// Receives transition events. Failures are logged and never abort a run.
pub trait StatusObserver: Send + Sync {
    fn on_transition(&self, event: &TransitionEvent) -> Result<()>;
}

impl<F> StatusObserver for F
where
    F: Fn(&TransitionEvent) + Send + Sync,
{
    fn on_transition(&self, event: &TransitionEvent) -> Result<()> {
        self(event);
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StatusObserver for NoopObserver {
    fn on_transition(&self, _event: &TransitionEvent) -> Result<()> {
        Ok(())
    }
}

/// Observer forwarding events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<TransitionEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransitionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusObserver for ChannelObserver {
    fn on_transition(&self, event: &TransitionEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| anyhow!("status receiver dropped"))
    }
}

/// Result of a controller run. Exhaustion is not an error: the last
/// candidate is returned with `reviewed_pass == false`.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub artifact: ResumeArtifact,
    pub reviewed_pass: bool,
    pub state: RetryState,
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        self.state.attempt
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.state.history
    }

    pub fn final_verdict(&self) -> Option<&ReviewVerdict> {
        self.state.last_verdict()
    }
}

/// Alternates a producer and a reviewer until a candidate passes or the
/// attempt budget is spent.
pub struct RetryController<'a> {
    producer: &'a dyn DraftProducer,
    reviewer: &'a dyn QualityReviewer,
    max_attempts: u32,
}

impl<'a> RetryController<'a> {
    pub fn new(
        producer: &'a dyn DraftProducer,
        reviewer: &'a dyn QualityReviewer,
        max_attempts: u32,
    ) -> Result<Self, PipelineError> {
        if max_attempts < 1 {
            return Err(PipelineError::Config(
                "translation_max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            producer,
            reviewer,
            max_attempts,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop. Producer and reviewer errors propagate immediately and
    /// do not count as a failed review.
    pub async fn run(
        &self,
        task: &TranslationTask<'_>,
        observer: &dyn StatusObserver,
    ) -> Result<RetryOutcome, PipelineError> {
        let mut state = RetryState::new(self.max_attempts);
        let target = task.target.code();

        loop {
            state.phase = RetryPhase::Producing;
            notify(observer, &state, task.target, state.last_verdict().cloned());

            let candidate = self
                .producer
                .produce(task, state.last_feedback.as_ref())
                .await?;

            state.phase = RetryPhase::Reviewing;
            notify(observer, &state, task.target, None);

            let verdict = self.reviewer.review(task, &candidate).await?;
            debug!(
                "Translation to {} attempt {}/{}: score={:.2}, passed={}",
                target, state.attempt, state.max_attempts, verdict.score, verdict.passed
            );

            if verdict.passed {
                state.phase = RetryPhase::Accepted;
                return Ok(self.finish(state, candidate, verdict, true, observer, task.target));
            }

            if state.attempt >= state.max_attempts {
                state.phase = RetryPhase::Exhausted;
                warn!(
                    "Translation to {} did not pass review after {} attempts (last score {:.2}), using best effort",
                    target, state.attempt, verdict.score
                );
                return Ok(self.finish(state, candidate, verdict, false, observer, task.target));
            }

            info!(
                "Translation to {} failed review (score {:.2}), retrying",
                target, verdict.score
            );
            state.phase = RetryPhase::Retrying;
            state.last_feedback = Some(DraftFeedback::new(candidate.html.clone(), verdict.feedback_text()));
            state.history.push(AttemptRecord {
                attempt: state.attempt,
                candidate,
                verdict,
            });
            state.attempt += 1;
        }
    }

    fn finish(
        &self,
        mut state: RetryState,
        candidate: ResumeArtifact,
        verdict: ReviewVerdict,
        reviewed_pass: bool,
        observer: &dyn StatusObserver,
        target: &Language,
    ) -> RetryOutcome {
        state.history.push(AttemptRecord {
            attempt: state.attempt,
            candidate: candidate.clone(),
            verdict: verdict.clone(),
        });
        notify(observer, &state, target, Some(verdict));
        RetryOutcome {
            artifact: candidate,
            reviewed_pass,
            state,
        }
    }
}

fn notify(
    observer: &dyn StatusObserver,
    state: &RetryState,
    target: &Language,
    verdict: Option<ReviewVerdict>,
) {
    let event = TransitionEvent {
        attempt: state.attempt,
        max_attempts: state.max_attempts,
        phase: state.phase,
        target: target.clone(),
        verdict,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| observer.on_transition(&event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Status observer failed on {:?}: {}", event.phase, e),
        Err(_) => warn!("Status observer panicked on {:?}", event.phase),
    }
}
