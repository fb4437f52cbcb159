/*!
 * Error types for the cvlingo application.
 *
 * Provider clients report `ProviderError`; everything the pipeline surfaces
 * to its callers is a `PipelineError`. A failed review and an exhausted
 * retry sequence are NOT errors and never show up here.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete within the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Whether the failure is transient and the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors surfaced by the optimize-then-translate pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Requested language code is not registered
    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    /// The language registry was constructed with inconsistent entries
    #[error("Invalid language registry: {0}")]
    InvalidRegistry(String),

    /// Upstream gating rejected the English draft
    #[error("Resume did not pass the filter chain: {0}")]
    FilterFailure(String),

    /// Generation service could not be reached or timed out
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// Generation service refused or returned unusable output
    #[error("Generation rejected: {0}")]
    GenerationRejected(String),

    /// Review service could not be reached or returned unusable output
    #[error("Review service unavailable: {0}")]
    ReviewUnavailable(String),

    /// Rendering the final document failed
    #[error("Render error: {0}")]
    Render(String),

    /// Storing the final document failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is missing or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Map a provider failure raised while generating a draft.
    pub fn from_generation(error: ProviderError) -> Self {
        if error.is_transient() {
            Self::GenerationUnavailable(error.to_string())
        } else {
            Self::GenerationRejected(error.to_string())
        }
    }

    /// Map a provider failure raised while reviewing a draft.
    pub fn from_review(error: ProviderError) -> Self {
        Self::ReviewUnavailable(error.to_string())
    }

    /// Infrastructure failures where re-running the pipeline later may help.
    pub fn is_retryable_later(&self) -> bool {
        matches!(
            self,
            Self::GenerationUnavailable(_) | Self::ReviewUnavailable(_)
        )
    }
}
