/*!
 * Provider implementations for the generation and judgment services.
 *
 * This module contains client implementations for the LLM providers the
 * translator and reviewer talk to:
 * - Anthropic: Anthropic Messages API
 * - OpenAI: OpenAI Chat Completions API (also LM Studio and other
 *   OpenAI-compatible servers)
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use log::warn;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod openai;

/// A single-turn completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt to guide the model
    pub system: String,

    /// User message
    pub prompt: String,

    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: 8192,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text returned by a provider with optional token accounting
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// Implementations are interchangeable behind `Arc<dyn Provider>`, so the
/// translator and the reviewer never depend on a concrete vendor client.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider identifier used in logs
    fn name(&self) -> &str;

    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

/// Client-side backoff for transient provider failures (rate limits, 5xx,
/// dropped connections). This lives below the review loop: a request that
/// still fails after `retry_count` retries is reported to the caller.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Retry count for failed requests
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    pub backoff_ms: u64,
}

impl BackoffPolicy {
    pub fn none() -> Self {
        Self {
            retry_count: 0,
            backoff_ms: 0,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(1 << (retry - 1).min(16)))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            backoff_ms: 1000,
        }
    }
}

/// Complete a request, retrying transient failures according to `policy`.
pub async fn complete_with_backoff(
    provider: &dyn Provider,
    request: CompletionRequest,
    policy: BackoffPolicy,
) -> Result<CompletionResponse, ProviderError> {
    let mut retry = 0;
    loop {
        match provider.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && retry < policy.retry_count => {
                retry += 1;
                let delay = policy.delay(retry);
                warn!(
                    "{} request failed ({}), retry {}/{} after {}ms",
                    provider.name(),
                    e,
                    retry,
                    policy.retry_count,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Deserialize a JSON object out of model output. Markdown code fences and
/// any prose around the outermost `{...}` are tolerated.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    let text = strip_json_fences(text);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let object = match (text.find('{'), text.rfind('}')) {
                (Some(start), Some(end)) if start < end => &text[start..=end],
                _ => return Err(ProviderError::ParseError(first_error.to_string())),
            };
            serde_json::from_str(object).map_err(|e| ProviderError::ParseError(e.to_string()))
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

/// Build the client for the configured provider.
pub fn create_provider(config: &TranslationConfig) -> Arc<dyn Provider> {
    let api_key = config.get_api_key();
    let endpoint = config.get_endpoint();
    let timeout = Duration::from_secs(config.get_timeout_secs());

    match config.provider {
        TranslationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(api_key, endpoint, config.get_model(), timeout))
        }
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            Arc::new(openai::OpenAI::new(api_key, endpoint, config.get_model(), timeout))
        }
    }
}
