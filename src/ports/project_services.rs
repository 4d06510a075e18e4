//! External project services - owner registry and project store.
//!
//! Both are synchronous request/response collaborators. The orchestrator
//! wraps every call in a timeout and decides about retries using
//! [`ServiceError::is_transient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::foundation::ProjectId;

/// An owner as known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub tax_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A project as stored upstream. Fields are keyed by dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

impl ServiceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ServiceError::Unavailable(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ServiceError::Rejected(message.into())
    }

    /// Network-level failures worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Timeout | ServiceError::Unavailable(_))
    }
}

/// Owner lookups by tax id.
#[async_trait]
pub trait OwnerRegistry: Send + Sync {
    /// Returns `Ok(None)` when no owner has this tax id.
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<OwnerRecord>, ServiceError>;
}

/// Project persistence owned by another system.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Creates a project. A repeated `idempotency_key` must return the id of
    /// the project it first created instead of creating another.
    async fn create(&self, idempotency_key: &str, fields: Map<String, Value>) -> Result<ProjectId, ServiceError>;

    async fn update(&self, id: &ProjectId, fields: Map<String, Value>) -> Result<ProjectRecord, ServiceError>;

    async fn get(&self, id: &ProjectId) -> Result<ProjectRecord, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_are_transient() {
        assert!(ServiceError::Timeout.is_transient());
        assert!(ServiceError::unavailable("502").is_transient());
        assert!(!ServiceError::not_found("owner").is_transient());
        assert!(!ServiceError::rejected("bad payload").is_transient());
    }
}
