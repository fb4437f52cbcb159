/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds, echoing the prompt
 * - `MockProvider::scripted()` - Replays a fixed list of replies in order
 * - `MockProvider::failing()` - Always fails with a transient error
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// One scripted provider reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this text
    Text(String),
    /// Fail with a transient connection error
    Unavailable,
    /// Fail with a non-retryable API error
    Rejected,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, echoing the prompt back
    Working,
    /// Replays the script; once exhausted, repeats the last reply
    Scripted,
    /// Always fails with a connection error
    Failing,
    /// Simulates slow response (for timeout and cancellation testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translator and reviewer behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    last: Arc<Mutex<Option<MockReply>>>,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(None)),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a slow mock provider
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock provider replaying `replies` in order
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        if let Ok(mut script) = provider.script.lock() {
            script.extend(replies);
        }
        provider
    }

    /// Number of `complete` calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(_) => return MockReply::Unavailable,
        };
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or(MockReply::Unavailable),
        }
    }
}

fn into_result(reply: MockReply) -> Result<CompletionResponse, ProviderError> {
    match reply {
        MockReply::Text(text) => Ok(CompletionResponse {
            output_tokens: Some(text.len() as u64 / 4),
            text,
            input_tokens: Some(10),
        }),
        MockReply::Unavailable => Err(ProviderError::ConnectionError(
            "Mock connection refused".to_string(),
        )),
        MockReply::Rejected => Err(ProviderError::ApiError {
            status_code: 400,
            message: "Mock request rejected".to_string(),
        }),
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.behavior {
            MockBehavior::Working => into_result(MockReply::Text(request.prompt)),
            MockBehavior::Scripted => into_result(self.next_reply()),
            MockBehavior::Failing => into_result(MockReply::Unavailable),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                into_result(MockReply::Text(request.prompt))
            }
        }
    }
}
