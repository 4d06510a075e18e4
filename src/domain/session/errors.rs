//! Session-specific error types.

use thiserror::Error;

use super::status::SessionStatus;
use crate::domain::foundation::{DomainError, ErrorCode, SessionId};
use crate::domain::project::{FieldPath, MergeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("cannot move session from {from} to {to}: {reason}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
        reason: String,
        missing: Vec<FieldPath>,
        conflicted: Vec<FieldPath>,
    },

    #[error("session is {0} and does not accept input")]
    NotAcceptingInput(SessionStatus),

    #[error("session is {0}; its draft can no longer change")]
    DraftLocked(SessionStatus),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl SessionError {
    pub fn invalid_transition(from: SessionStatus, to: SessionStatus, reason: impl Into<String>) -> Self {
        SessionError::InvalidTransition {
            from,
            to,
            reason: reason.into(),
            missing: Vec::new(),
            conflicted: Vec::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::InvalidTransition { .. } | SessionError::DraftLocked(_) => {
                ErrorCode::InvalidStateTransition
            }
            SessionError::NotAcceptingInput(_) => ErrorCode::SessionNotAcceptingInput,
            SessionError::Merge(MergeError::NoConflict(_)) => ErrorCode::MergeConflict,
            SessionError::Merge(MergeError::Invalid(_)) => ErrorCode::ValidationFailed,
        }
    }
}

fn join(paths: &[FieldPath]) -> String {
    paths.iter().map(FieldPath::as_str).collect::<Vec<_>>().join(",")
}

impl From<SessionError> for DomainError {
    fn from(err: SessionError) -> Self {
        let base = DomainError::new(err.code(), err.to_string());
        match &err {
            SessionError::InvalidTransition {
                from,
                to,
                missing,
                conflicted,
                ..
            } => {
                let mut out = base
                    .with_detail("from", from.to_string())
                    .with_detail("to", to.to_string());
                if !missing.is_empty() {
                    out = out.with_detail("missing_fields", join(missing));
                }
                if !conflicted.is_empty() {
                    out = out.with_detail("conflicted_fields", join(conflicted));
                }
                out
            }
            SessionError::NotFound(id) => base.with_detail("session_id", id.to_string()),
            SessionError::NotAcceptingInput(status) | SessionError::DraftLocked(status) => {
                base.with_detail("status", status.to_string())
            }
            SessionError::Merge(MergeError::NoConflict(path)) => base.with_detail("field", path.as_str()),
            SessionError::Merge(MergeError::Invalid(inner)) => base.with_detail("field", inner.field()),
        }
    }
}
