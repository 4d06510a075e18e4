//! In-Memory Tool Call Log Adapter
//!
//! Keeps tool call records per session in memory. Records live as long as
//! the process; they are dropped when the session is evicted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{SessionId, ToolCallId};
use crate::domain::tools::ToolCallRecord;
use crate::ports::{ToolCallLog, ToolCallLogError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryToolCallLog {
    records: Arc<RwLock<HashMap<SessionId, Vec<ToolCallRecord>>>>,
}

impl InMemoryToolCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ToolCallLog for InMemoryToolCallLog {
    async fn find(&self, session_id: SessionId, call_id: &ToolCallId) -> Result<Option<ToolCallRecord>, ToolCallLogError> {
        let records = self.records.read().await;
        Ok(records
            .get(&session_id)
            .and_then(|list| list.iter().find(|r| &r.call_id == call_id))
            .cloned())
    }

    async fn record(&self, record: ToolCallRecord) -> Result<(), ToolCallLogError> {
        let mut records = self.records.write().await;
        let list = records.entry(record.session_id).or_default();
        if !list.iter().any(|r| r.call_id == record.call_id) {
            list.push(record);
        }
        Ok(())
    }

    async fn for_session(&self, session_id: SessionId) -> Result<Vec<ToolCallRecord>, ToolCallLogError> {
        Ok(self.records.read().await.get(&session_id).cloned().unwrap_or_default())
    }

    async fn forget_session(&self, session_id: SessionId) -> Result<(), ToolCallLogError> {
        self.records.write().await.remove(&session_id);
        Ok(())
    }
}
