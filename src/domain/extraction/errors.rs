//! Extraction error taxonomy.
//!
//! All of these are recoverable: the session stays active and the error is
//! reported to the user in the conversation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("unsupported document type '{declared}'")]
    UnsupportedFormat { declared: String },

    #[error("document is {size} bytes, limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("could not read {format} document: {reason}")]
    ParseFailure { format: String, reason: String },

    #[error("document contains no readable text")]
    EmptyDocument,

    #[error("extraction was cancelled")]
    Cancelled,
}

impl ExtractionError {
    pub fn unsupported(declared: impl Into<String>) -> Self {
        ExtractionError::UnsupportedFormat {
            declared: declared.into(),
        }
    }

    pub fn parse_failure(format: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractionError::ParseFailure {
            format: format.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractionError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            ExtractionError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            ExtractionError::ParseFailure { .. } => ErrorCode::ParseFailure,
            ExtractionError::EmptyDocument => ErrorCode::EmptyDocument,
            ExtractionError::Cancelled => ErrorCode::InternalError,
        }
    }

    /// Plain-language explanation for the chat.
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::UnsupportedFormat { declared } => format!(
                "I can't read '{}' files. Please upload a PDF, Word (.docx) or Excel (.xlsx/.xls) document.",
                declared
            ),
            ExtractionError::FileTooLarge { limit, .. } => format!(
                "That file is too large. The limit is {} MB.",
                limit / (1024 * 1024)
            ),
            ExtractionError::ParseFailure { format, .. } => format!(
                "I couldn't read that {} file; it may be damaged or password protected. Could you try another copy?",
                format
            ),
            ExtractionError::EmptyDocument => {
                "The document doesn't contain any readable text. If it is a scanned image, could you share the details in the chat instead?".to_string()
            }
            ExtractionError::Cancelled => "The document processing was cancelled.".to_string(),
        }
    }
}
