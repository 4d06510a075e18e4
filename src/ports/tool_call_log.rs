//! Tool Call Log Port - at-most-once bookkeeping for tool calls.
//!
//! Keyed by `(session, call id)`. The orchestrator looks a call up before
//! executing it and records the outcome afterwards, so a replayed call id
//! returns the cached outcome instead of repeating a side effect.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{SessionId, ToolCallId};
use crate::domain::tools::ToolCallRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool call log unavailable: {0}")]
pub struct ToolCallLogError(pub String);

#[async_trait]
pub trait ToolCallLog: Send + Sync {
    async fn find(&self, session_id: SessionId, call_id: &ToolCallId) -> Result<Option<ToolCallRecord>, ToolCallLogError>;

    /// Stores a record. An existing record for the same key is kept.
    async fn record(&self, record: ToolCallRecord) -> Result<(), ToolCallLogError>;

    /// All records for a session in execution order.
    async fn for_session(&self, session_id: SessionId) -> Result<Vec<ToolCallRecord>, ToolCallLogError>;

    /// Drops every record of an evicted session.
    async fn forget_session(&self, session_id: SessionId) -> Result<(), ToolCallLogError>;
}
