//! Request and response bodies for the ingestion API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::application::{
    ChangeSessionStateResult, CompletionView, DescriptionSource, GenerateDescriptionResult, ResolveConflictResult,
    SendMessageResult, StartSessionResult, ToolExecution, UploadDocumentResult, UploadView,
};
use crate::domain::extraction::{DocumentFormat, RawDocument, UploadPolicy};
use crate::domain::foundation::{DomainError, ProjectId, SessionId, ToolCallId};
use crate::domain::project::{ConflictResolution, FieldPath};
use crate::domain::session::SessionStatus;

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub owner_tax_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Document upload. The file travels base64 encoded inside the JSON body.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadDocumentRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    /// MIME type or bare extension as declared by the client.
    pub media_type: String,
    pub content_base64: String,
}

impl UploadDocumentRequest {
    pub fn into_raw(self) -> Result<RawDocument, base64::DecodeError> {
        let bytes = STANDARD.decode(self.content_base64.trim())?;
        let raw = RawDocument::new(self.media_type, bytes);
        Ok(match self.file_name {
            Some(name) => raw.with_file_name(name),
            None => raw,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "async", default)]
    pub run_async: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResolveConflictRequest {
    pub resolution: ConflictResolution,
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub greeting: String,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<StartSessionResult> for StartSessionResponse {
    fn from(result: StartSessionResult) -> Self {
        Self {
            session_id: result.session_id,
            status: result.status,
            greeting: result.greeting,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolCallSummary {
    pub call_id: ToolCallId,
    pub tool: String,
    pub success: bool,
    pub replayed: bool,
}

impl From<&ToolExecution> for ToolCallSummary {
    fn from(execution: &ToolExecution) -> Self {
        Self {
            call_id: execution.call_id.clone(),
            tool: execution.tool_name.clone(),
            success: execution.outcome.is_success(),
            replayed: execution.replayed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
    pub status: SessionStatus,
    pub accepted_fields: Vec<FieldPath>,
    pub tool_calls: Vec<ToolCallSummary>,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<SendMessageResult> for SendMessageResponse {
    fn from(result: SendMessageResult) -> Self {
        Self {
            tool_calls: result.tool_calls.iter().map(ToolCallSummary::from).collect(),
            reply: result.reply,
            status: result.status,
            accepted_fields: result.accepted,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadView>,
    pub duplicate: bool,
    pub reply: String,
    pub merged_fields: Vec<FieldPath>,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<UploadDocumentResult> for UploadDocumentResponse {
    fn from(result: UploadDocumentResult) -> Self {
        Self {
            upload: result.upload.as_ref().map(UploadView::from),
            duplicate: result.duplicate,
            reply: result.reply,
            merged_fields: result.merged,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DescriptionResponse {
    pub description: String,
    /// "model" or "template".
    pub source: &'static str,
    pub merged: bool,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<GenerateDescriptionResult> for DescriptionResponse {
    fn from(result: GenerateDescriptionResult) -> Self {
        Self {
            description: result.description,
            source: match result.source {
                DescriptionSource::Model => "model",
                DescriptionSource::Template => "template",
            },
            merged: result.merged,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStateResponse {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<ChangeSessionStateResult> for SessionStateResponse {
    fn from(result: ChangeSessionStateResult) -> Self {
        Self {
            status: result.status,
            project_id: result.project_id,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveConflictResponse {
    pub field: FieldPath,
    pub value: Option<serde_json::Value>,
    pub status: SessionStatus,
    #[serde(flatten)]
    pub completion: CompletionView,
}

impl From<ResolveConflictResult> for ResolveConflictResponse {
    fn from(result: ResolveConflictResult) -> Self {
        Self {
            field: result.field,
            value: result.value.map(|value| value.to_json()),
            status: result.status,
            completion: result.completion,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct SupportedFormat {
    pub format: DocumentFormat,
    pub extension: String,
    pub media_type: &'static str,
}

/// The upload allow-list.
#[derive(Debug, Serialize)]
pub struct SupportedFormatsResponse {
    pub formats: Vec<SupportedFormat>,
    pub max_size_bytes: usize,
}

impl From<&UploadPolicy> for SupportedFormatsResponse {
    fn from(policy: &UploadPolicy) -> Self {
        Self {
            formats: policy
                .allowed
                .iter()
                .map(|format| SupportedFormat {
                    format: *format,
                    extension: format!(".{}", format.extension()),
                    media_type: format.mime_type(),
                })
                .collect(),
            max_size_bytes: policy.max_bytes,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<DomainError> for ErrorResponse {
    fn from(err: DomainError) -> Self {
        let details = if err.details.is_empty() {
            None
        } else {
            serde_json::to_value(&err.details).ok()
        };
        Self {
            code: err.code.to_string(),
            message: err.message,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn upload_body_decodes_base64() {
        let req = UploadDocumentRequest {
            file_name: Some("brochure.pdf".to_string()),
            media_type: "application/pdf".to_string(),
            content_base64: STANDARD.encode(b"%PDF-1.4"),
        };

        let raw = req.into_raw().unwrap();

        assert_eq!(raw.bytes, b"%PDF-1.4");
        assert_eq!(raw.file_name.as_deref(), Some("brochure.pdf"));
    }

    #[test]
    fn supported_formats_follow_the_policy() {
        let policy = UploadPolicy {
            max_bytes: 1024,
            allowed: vec![DocumentFormat::Pdf, DocumentFormat::Xlsx],
        };

        let json = serde_json::to_value(SupportedFormatsResponse::from(&policy)).unwrap();

        assert_eq!(json["max_size_bytes"], 1024);
        assert_eq!(json["formats"][0]["format"], "pdf");
        assert_eq!(json["formats"][0]["extension"], ".pdf");
        assert_eq!(json["formats"][0]["media_type"], "application/pdf");
        assert_eq!(json["formats"][1]["format"], "xlsx");
        assert_eq!(json["formats"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn bad_base64_is_an_error() {
        let req = UploadDocumentRequest {
            file_name: None,
            media_type: "pdf".to_string(),
            content_base64: "***".to_string(),
        };
        assert!(req.into_raw().is_err());
    }

    #[test]
    fn async_flag_reads_the_reserved_word() {
        let query: UploadQuery = serde_json::from_str(r#"{"async": true}"#).unwrap();
        assert!(query.run_async);
    }

    #[test]
    fn domain_error_details_become_json() {
        let err = DomainError::new(ErrorCode::InvalidStateTransition, "nope").with_detail("from", "paused");
        let response = ErrorResponse::from(err);

        assert_eq!(response.code, "INVALID_STATE_TRANSITION");
        assert_eq!(response.details.unwrap()["from"], "paused");
    }
}
