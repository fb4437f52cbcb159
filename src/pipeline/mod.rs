/*!
 * The optimize-then-translate pipeline.
 *
 * - `filters`: upstream gating of the English draft
 * - `render`: document rendering collaborators
 * - `coordinator`: ties gating, translation, rendering and storage together
 */

pub use self::coordinator::{OutcomeStatus, PipelineCoordinator, PipelineOutcome};
pub use self::filters::{
    DraftContext, FilterChain, FilterResult, GatedOptimizer, KeywordCoverage, MarkupValidator,
    ResumeDrafter, ResumeFilter, ResumeOptimizer, ValidationResult, FINAL_CHECK_PRIORITY,
};
pub use self::render::{CommandRenderer, DocumentRenderer, HtmlRenderer};

pub mod coordinator;
pub mod filters;
pub mod render;
