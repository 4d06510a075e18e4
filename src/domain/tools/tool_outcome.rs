//! Results of tool execution as fed back to the model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure categories a tool can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Upstream timed out or could not be reached.
    Unavailable,
    NotFound,
    /// Arguments or preconditions were invalid.
    Rejected,
}

/// Structured tool error. Never propagated as a fault; it becomes the
/// tool-result message the model sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Rejected,
            message: message.into(),
        }
    }

    /// Only transient upstream failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind == ToolErrorKind::Unavailable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { data: serde_json::Value },
    Error { error: ToolError },
}

impl ToolOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        ToolOutcome::Success { data }
    }

    pub fn error(error: ToolError) -> Self {
        ToolOutcome::Error { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            ToolOutcome::Success { data } => Some(data),
            ToolOutcome::Error { .. } => None,
        }
    }

    pub fn error_ref(&self) -> Option<&ToolError> {
        match self {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Error { error } => Some(error),
        }
    }

    /// JSON body of the tool-result message.
    pub fn to_message_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"status":"error"}"#.to_string())
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Success { .. } => f.write_str("success"),
            ToolOutcome::Error { error } => write!(f, "error ({})", error),
        }
    }
}
