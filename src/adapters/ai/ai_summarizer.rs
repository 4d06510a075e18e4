//! Model-backed conversation summarizer.

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

use crate::domain::conversation::{ConversationMessage, Role};
use crate::domain::foundation::SessionId;
use crate::domain::response::SUMMARY_INSTRUCTIONS;
use crate::ports::{AIError, AIProvider, CompletionRequest, ConversationSummarizer, Message, RequestMetadata, RequestPurpose};

/// Asks the language model for a short narrative of collapsed messages.
pub struct AISummarizer {
    provider: Arc<dyn AIProvider>,
    max_tokens: u32,
}

impl AISummarizer {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            max_tokens: 300,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn transcript(messages: &[ConversationMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let speaker = match message.role() {
            Role::User => "User",
            Role::Assistant if !message.tool_calls().is_empty() => {
                let names: Vec<&str> = message.tool_calls().iter().map(|c| c.name()).collect();
                let _ = writeln!(out, "Assistant called tools: {}", names.join(", "));
                continue;
            }
            Role::Assistant => "Assistant",
            Role::ToolResult => "Tool",
            Role::System => "Note",
        };
        let _ = writeln!(out, "{}: {}", speaker, message.content());
    }
    out
}

#[async_trait]
impl ConversationSummarizer for AISummarizer {
    async fn summarize(&self, session_id: SessionId, messages: &[ConversationMessage]) -> Result<String, AIError> {
        if messages.is_empty() {
            return Ok(String::new());
        }

        let request = CompletionRequest::new(RequestPurpose::Summary, RequestMetadata::new(session_id))
            .with_system_prompt(SUMMARY_INSTRUCTIONS)
            .with_message(Message::user(transcript(messages)))
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0);

        let response = self.provider.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};

    fn messages() -> Vec<ConversationMessage> {
        vec![
            ConversationMessage::user(1, "Solo apartamentos, por favor"),
            ConversationMessage::assistant(2, "Entendido. ¿En qué ciudad está el proyecto?"),
        ]
    }

    #[tokio::test]
    async fn returns_trimmed_model_narrative() {
        let mock = MockAIProvider::new().with_purpose_response(RequestPurpose::Summary, "  The user only sells apartments.\n");
        let summarizer = AISummarizer::new(Arc::new(mock.clone()));

        let text = summarizer.summarize(SessionId::new(), &messages()).await.unwrap();

        assert_eq!(text, "The user only sells apartments.");
        let calls = mock.get_calls();
        assert_eq!(calls[0].purpose, RequestPurpose::Summary);
        assert!(calls[0].last_user_message().unwrap().contains("User: Solo apartamentos"));
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let mock = MockAIProvider::new();
        let summarizer = AISummarizer::new(Arc::new(mock.clone()));
        assert_eq!(summarizer.summarize(SessionId::new(), &[]).await.unwrap(), "");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn propagates_provider_errors() {
        let mock = MockAIProvider::new().with_error(
            RequestPurpose::Summary,
            MockError::Timeout { timeout_secs: 5 },
        );
        let summarizer = AISummarizer::new(Arc::new(mock));
        let err = summarizer.summarize(SessionId::new(), &messages()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
