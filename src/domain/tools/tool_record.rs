//! Audit record of an executed tool call.

use serde::{Deserialize, Serialize};

use super::tool_outcome::ToolOutcome;
use crate::domain::foundation::{SessionId, Timestamp, ToolCallId};

/// One executed call. The (session, call id) pair is unique; replaying
/// the id returns this record's outcome instead of executing again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub session_id: SessionId,
    pub call_id: ToolCallId,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub outcome: ToolOutcome,
    pub attempts: u32,
    pub executed_at: Timestamp,
    /// False when the session was cancelled before the result could apply.
    pub applied: bool,
}

impl ToolCallRecord {
    pub fn new(
        session_id: SessionId,
        call_id: ToolCallId,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        outcome: ToolOutcome,
        attempts: u32,
    ) -> Self {
        Self {
            session_id,
            call_id,
            tool_name: tool_name.into(),
            arguments,
            outcome,
            attempts,
            executed_at: Timestamp::now(),
            applied: true,
        }
    }

    pub fn discarded(mut self) -> Self {
        self.applied = false;
        self
    }
}
