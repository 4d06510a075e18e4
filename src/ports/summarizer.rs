//! Summarizer Port - narrative summaries of collapsed history.

use async_trait::async_trait;

use super::AIError;
use crate::domain::conversation::ConversationMessage;
use crate::domain::foundation::SessionId;

/// Writes a short narrative of the given messages.
///
/// The narrative is colour only. Accepted field values, the missing-field
/// list and user constraints are carried by the fact sheet, never by this
/// text.
#[async_trait]
pub trait ConversationSummarizer: Send + Sync {
    async fn summarize(&self, session_id: SessionId, messages: &[ConversationMessage]) -> Result<String, AIError>;
}
