/*!
 * Resume translation with an automated quality gate.
 *
 * - `translator`: Draft Producer trait and the LLM-backed translator
 * - `reviewer`: Quality Reviewer trait and the LLM-backed reviewer
 * - `verdict`: structured review result
 * - `prompts`: prompt templates and builders
 * - `retry`: the translate-review retry state machine and status events
 */

pub use self::retry::{
    AttemptRecord, ChannelObserver, NoopObserver, RetryController, RetryOutcome, RetryPhase,
    RetryState, StatusObserver, TransitionEvent,
};
pub use self::reviewer::{LlmReviewer, QualityReviewer, DEFAULT_PASS_THRESHOLD};
pub use self::translator::{DraftFeedback, DraftProducer, Glossary, LlmTranslator, TranslationTask};
pub use self::verdict::{IssueCategory, ReviewIssue, ReviewVerdict};

pub mod prompts;
pub mod retry;
pub mod reviewer;
pub mod translator;
pub mod verdict;
