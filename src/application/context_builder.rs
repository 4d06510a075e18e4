//! Builds the model context for a turn, compacting history when it grows
//! past the high-water mark.

use std::sync::Arc;

use crate::domain::conversation::{
    ContextConfig, ContextOverflowError, ContextSummary, ContextWindow, ContextWindowManager, ConversationMessage,
    FactSheet, Role,
};
use crate::domain::session::ConversationSession;
use crate::ports::{ConversationSummarizer, Message};

/// Window assembly plus summarize-then-truncate compaction.
pub struct ContextBuilder {
    manager: ContextWindowManager,
    summarizer: Arc<dyn ConversationSummarizer>,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig, summarizer: Arc<dyn ConversationSummarizer>) -> Self {
        Self {
            manager: ContextWindowManager::new(config),
            summarizer,
        }
    }

    /// Returns a window that fits the budget.
    ///
    /// When the full window crosses the high-water mark the older messages
    /// are summarized and the summary is stored on the session. A failed
    /// summary is logged and the builder falls back to truncation.
    pub async fn build(
        &self,
        session: &mut ConversationSession,
        system_prompt: &str,
    ) -> Result<ContextWindow, ContextOverflowError> {
        let window = self.manager.assemble(system_prompt, session.history(), session.summary());
        if !self.manager.over_high_water(&window) {
            return Ok(window);
        }

        let plan = self
            .manager
            .plan_compaction(session.history(), session.summary())
            .map(|plan| (plan.messages.to_vec(), plan.covers_through));

        if let Some((collapsed, covers_through)) = plan {
            match self.summarizer.summarize(session.id(), &collapsed).await {
                Ok(narrative) => {
                    let facts = FactSheet::capture(session.draft(), session.constraints());
                    let narrative = Some(narrative.trim()).filter(|text| !text.is_empty());
                    session.set_summary(ContextSummary::compose(covers_through, &facts, narrative));
                    tracing::info!(
                        session_id = %session.id(),
                        covers_through,
                        collapsed = collapsed.len(),
                        "conversation history summarized"
                    );
                }
                Err(err) => {
                    tracing::warn!(session_id = %session.id(), error = %err, "summarization failed, truncating");
                }
            }
        }

        let window = self.manager.assemble(system_prompt, session.history(), session.summary());
        if self.manager.fits(&window) {
            return Ok(window);
        }
        let window = self.manager.truncate(system_prompt, session.history(), session.summary())?;
        tracing::debug!(session_id = %session.id(), dropped = window.dropped, "context truncated");
        Ok(window)
    }
}

/// Splits a window into the provider's system prompt and message list.
pub fn to_request_messages(window: &ContextWindow) -> (String, Vec<Message>) {
    let mut messages = window.messages.iter();
    let system_prompt = match window.messages.first() {
        Some(first) if first.role() == Role::System => {
            messages.next();
            first.content().to_string()
        }
        _ => String::new(),
    };
    (system_prompt, messages.map(to_message).collect())
}

fn to_message(message: &ConversationMessage) -> Message {
    match message.role() {
        Role::System => Message::system(message.content()),
        Role::User => Message::user(message.content()),
        Role::Assistant if !message.tool_calls().is_empty() => {
            Message::assistant_tool_calls(message.content(), message.tool_calls().to_vec())
        }
        Role::Assistant => Message::assistant(message.content()),
        Role::ToolResult => match message.tool_call_id() {
            Some(call_id) => Message::tool(call_id.clone(), message.content()),
            None => Message::system(message.content()),
        },
    }
}
