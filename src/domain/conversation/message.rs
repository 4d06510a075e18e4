//! Message entity for ingestion conversations.
//!
//! Messages are immutable once appended to a session. Each carries a
//! per-session sequence number so summaries can say exactly which prefix
//! of the history they cover.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, ToolCallId};
use crate::domain::tools::ToolCall;

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Structured result of a tool call, addressed back to the model.
    ToolResult,
}

impl Role {
    /// Returns true if this is a user-visible role.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    id: MessageId,
    seq: u64,
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<ToolCallId>,
    created_at: Timestamp,
}

impl ConversationMessage {
    fn build(seq: u64, role: Role, content: String) -> Self {
        Self {
            id: MessageId::new(),
            seq,
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Timestamp::now(),
        }
    }

    pub fn user(seq: u64, content: impl Into<String>) -> Self {
        Self::build(seq, Role::User, content.into())
    }

    pub fn assistant(seq: u64, content: impl Into<String>) -> Self {
        Self::build(seq, Role::Assistant, content.into())
    }

    pub fn system(seq: u64, content: impl Into<String>) -> Self {
        Self::build(seq, Role::System, content.into())
    }

    /// An assistant turn that requested tools instead of (or before) replying.
    pub fn assistant_tool_calls(seq: u64, content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut message = Self::build(seq, Role::Assistant, content.into());
        message.tool_calls = calls;
        message
    }

    pub fn tool_result(seq: u64, call_id: ToolCallId, content: impl Into<String>) -> Self {
        let mut message = Self::build(seq, Role::ToolResult, content.into());
        message.tool_call_id = Some(call_id);
        message
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn tool_call_id(&self) -> Option<&ToolCallId> {
        self.tool_call_id.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Rough token estimate: ~4 characters per token plus a role marker.
    pub fn estimate_tokens(&self) -> u32 {
        let calls: usize = self
            .tool_calls
            .iter()
            .map(|call| call.name().len() + call.arguments().to_string().len())
            .sum();
        estimate_tokens(&self.content) + (calls / 4) as u32 + 4
    }
}

pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() / 4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_message_is_visible() {
        let msg = ConversationMessage::user(1, "Hola");
        assert_eq!(msg.role(), Role::User);
        assert!(msg.role().is_user_visible());
        assert_eq!(msg.seq(), 1);
    }

    #[test]
    fn tool_result_carries_call_id() {
        let id = ToolCallId::new("call_7").unwrap();
        let msg = ConversationMessage::tool_result(3, id.clone(), "{}");
        assert_eq!(msg.tool_call_id(), Some(&id));
        assert!(!msg.role().is_user_visible());
    }

    #[test]
    fn tool_calls_count_towards_tokens() {
        let call = ToolCall::new(
            ToolCallId::new("call_1").unwrap(),
            "lookup_owner",
            json!({"tax_id": "900123456"}),
        );
        let bare = ConversationMessage::assistant(1, "");
        let with_call = ConversationMessage::assistant_tool_calls(1, "", vec![call]);
        assert!(with_call.estimate_tokens() > bare.estimate_tokens());
    }

    #[test]
    fn estimate_is_quarter_of_length() {
        assert_eq!(estimate_tokens(&"a".repeat(400)), 100);
    }
}
