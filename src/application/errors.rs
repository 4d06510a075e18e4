//! Errors returned by the application handlers.

use thiserror::Error;

use crate::domain::conversation::ContextOverflowError;
use crate::domain::foundation::{DomainError, ErrorCode, UploadId, ValidationError};
use crate::domain::session::SessionError;
use crate::ports::{AIError, ToolCallLogError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("message content cannot be empty")]
    EmptyMessage,

    #[error("upload not found: {0}")]
    UploadNotFound(UploadId),

    /// Both summarization and truncation failed to fit the window.
    #[error("conversation context overflow: {0}")]
    ContextOverflow(#[from] ContextOverflowError),

    #[error("language model failed: {0}")]
    AIProvider(#[from] AIError),

    #[error(transparent)]
    ToolLog(#[from] ToolCallLogError),

    /// The session was cancelled while the request was in flight.
    #[error("session was cancelled during the request")]
    Cancelled,
}

impl IngestionError {
    /// True when the caller may repeat the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestionError::ContextOverflow(_) | IngestionError::ToolLog(_) => true,
            IngestionError::AIProvider(err) => err.is_retryable(),
            _ => false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            IngestionError::Session(err) => err.code(),
            IngestionError::Validation(_) | IngestionError::EmptyMessage => ErrorCode::ValidationFailed,
            IngestionError::UploadNotFound(_) => ErrorCode::UploadNotFound,
            IngestionError::ContextOverflow(_) => ErrorCode::ContextOverflow,
            IngestionError::AIProvider(_) => ErrorCode::AIProviderError,
            IngestionError::ToolLog(_) => ErrorCode::ServiceUnavailable,
            IngestionError::Cancelled => ErrorCode::InvalidStateTransition,
        }
    }
}

impl From<IngestionError> for DomainError {
    fn from(err: IngestionError) -> Self {
        let retryable = err.is_retryable();
        let domain = match err {
            IngestionError::Session(err) => DomainError::from(err),
            IngestionError::Validation(err) => DomainError::from(err),
            other => DomainError::new(other.code(), other.to_string()),
        };
        if retryable {
            domain.with_detail("retryable", "true")
        } else {
            domain
        }
    }
}
