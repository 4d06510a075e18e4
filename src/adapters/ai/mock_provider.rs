//! Mock AI Provider for testing.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing tests to run without calling real AI APIs.
//!
//! # Features
//!
//! - Pre-configured responses, queued per [`RequestPurpose`]
//! - Scripted tool calls for conversational turns
//! - Simulated delays for timeout testing
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_tool_calls(vec![ToolCall::new(id, "list_missing_fields", json!({}))])
//!     .with_response("What city is the project in?")
//!     .with_purpose_response(RequestPurpose::Extraction, r#"{"name": "Altos"}"#);
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::tools::ToolCall;
use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, ProviderInfo, RequestPurpose, TokenUsage,
};

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses per purpose (consumed in order).
    responses: Arc<Mutex<HashMap<RequestPurpose, VecDeque<MockResponse>>>>,
    info: ProviderInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    ContextTooLong { tokens: u32, max: u32 },
    Unavailable { message: String },
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContextTooLong { tokens, max } => AIError::context_too_long(tokens, max),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            info: ProviderInfo::new("mock", "mock-model-1", 128_000).with_functions(true),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(self, purpose: RequestPurpose, response: MockResponse) -> Self {
        locked(&self.responses).entry(purpose).or_default().push_back(response);
        self
    }

    /// Queues a conversational reply.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.push(RequestPurpose::Turn, MockResponse::Text(content.into()))
    }

    /// Queues a turn in which the model calls tools.
    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.push(RequestPurpose::Turn, MockResponse::ToolCalls(calls))
    }

    /// Queues a reply for extraction, summary or description requests.
    pub fn with_purpose_response(self, purpose: RequestPurpose, content: impl Into<String>) -> Self {
        self.push(purpose, MockResponse::Text(content.into()))
    }

    pub fn with_error(self, purpose: RequestPurpose, error: MockError) -> Self {
        self.push(purpose, MockResponse::Error(error))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_provider_info(mut self, info: ProviderInfo) -> Self {
        self.info = info;
        self
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    pub fn calls_for(&self, purpose: RequestPurpose) -> usize {
        locked(&self.calls).iter().filter(|c| c.purpose == purpose).count()
    }

    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        locked(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        locked(&self.calls).clear();
    }

    fn next_response(&self, purpose: RequestPurpose) -> MockResponse {
        locked(&self.responses)
            .get_mut(&purpose)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| MockResponse::Text(default_content(purpose).to_string()))
    }
}

fn default_content(purpose: RequestPurpose) -> &'static str {
    match purpose {
        RequestPurpose::Turn => "Mock response",
        RequestPurpose::Extraction => "{}",
        RequestPurpose::Summary => "Mock summary",
        RequestPurpose::Description => "Mock description of the project and its surroundings.",
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let purpose = request.purpose;
        locked(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let mut response = match self.next_response(purpose) {
            MockResponse::Text(content) => CompletionResponse::text(content),
            MockResponse::ToolCalls(calls) => CompletionResponse::with_tool_calls(calls),
            MockResponse::Error(err) => return Err(err.into()),
        };
        response.usage = TokenUsage::new(10, 20);
        response.model = self.info.model.clone();
        Ok(response)
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionId, ToolCallId};
    use crate::ports::{FinishReason, Message, RequestMetadata};

    fn request(purpose: RequestPurpose) -> CompletionRequest {
        CompletionRequest::new(purpose, RequestMetadata::new(SessionId::new())).with_message(Message::user("Hello"))
    }

    #[tokio::test]
    async fn returns_configured_response() {
        let provider = MockAIProvider::new().with_response("Hello from mock!");
        let response = provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert_eq!(response.content, "Hello from mock!");
        assert_eq!(response.model, "mock-model-1");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn queues_are_separate_per_purpose() {
        let provider = MockAIProvider::new()
            .with_response("turn reply")
            .with_purpose_response(RequestPurpose::Extraction, r#"{"name": "Altos"}"#);

        let extraction = provider.complete(request(RequestPurpose::Extraction)).await.unwrap();
        let turn = provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert_eq!(extraction.content, r#"{"name": "Altos"}"#);
        assert_eq!(turn.content, "turn reply");
        assert_eq!(provider.calls_for(RequestPurpose::Extraction), 1);
    }

    #[tokio::test]
    async fn scripted_tool_calls() {
        let call = ToolCall::new(ToolCallId::new("call_1").unwrap(), "list_missing_fields", serde_json::json!({}));
        let provider = MockAIProvider::new().with_tool_calls(vec![call.clone()]);
        let response = provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert!(response.wants_tools());
        assert_eq!(response.tool_calls, vec![call]);
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    }

    #[tokio::test]
    async fn defaults_after_exhausted() {
        let provider = MockAIProvider::new().with_response("Only one");
        provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        let second = provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert_eq!(second.content, "Mock response");
        let extraction = provider.complete(request(RequestPurpose::Extraction)).await.unwrap();
        assert_eq!(extraction.content, "{}");
    }

    #[tokio::test]
    async fn returns_configured_error() {
        let provider = MockAIProvider::new().with_error(
            RequestPurpose::Summary,
            MockError::Unavailable {
                message: "down".into(),
            },
        );
        let err = provider.complete(request(RequestPurpose::Summary)).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn tracks_calls() {
        let provider = MockAIProvider::new();
        assert_eq!(provider.call_count(), 0);
        provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert_eq!(provider.call_count(), 1);
        provider.clear_calls();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn respects_delay() {
        let provider = MockAIProvider::new().with_delay(Duration::from_millis(20));
        let start = std::time::Instant::now();
        provider.complete(request(RequestPurpose::Turn)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
