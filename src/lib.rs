/*!
 * # cvlingo - Resume optimization and translation with AI
 *
 * A Rust library that tailors a resume to a job posting and translates the
 * approved result into the requested output language.
 *
 * ## Features
 *
 * - Upstream gating of the English draft through a prioritized filter chain
 * - Translate-then-review loop with a bounded number of attempts
 * - Reviewer feedback carried into every retry
 * - Best-effort output when no candidate passes review
 * - Status events for every step of the loop
 * - Language-suffixed document storage (`_en.pdf`, `_ru.pdf`)
 * - Anthropic, OpenAI and LM Studio providers
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `language`: Language registry and ISO code utilities
 * - `artifact`: Resume sources, job postings and HTML artifacts
 * - `markup`: Tag skeleton and protected term checks on HTML
 * - `translation`: Translation with review:
 *   - `translation::translator`: Draft producer
 *   - `translation::reviewer`: Quality reviewer
 *   - `translation::retry`: Retry controller and status events
 * - `pipeline`: Filter chain, rendering and the pipeline coordinator
 * - `storage`: Output folder persistence
 * - `providers`: Client implementations for LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod artifact;
pub mod errors;
pub mod language;
pub mod markup;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use artifact::{JobPosting, ResumeArtifact, ResumeSource};
pub use errors::{PipelineError, ProviderError};
pub use language::{get_language_name, language_codes_match, Language, LanguageRegistry};
pub use pipeline::{OutcomeStatus, PipelineCoordinator, PipelineOutcome};
pub use storage::{DocumentStore, PdfStorage};
pub use translation::{RetryController, StatusObserver, TransitionEvent};
