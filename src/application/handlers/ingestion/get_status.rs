//! GetSessionStatusHandler - full snapshot of one session.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::SessionRegistry;
use crate::domain::conversation::{ConversationMessage, Role};
use crate::domain::extraction::{DocumentFormat, DocumentUpload, ExtractionError, ProcessingStatus};
use crate::domain::foundation::{ProjectId, SessionId, Timestamp, UploadId};
use crate::domain::project::{AcceptedField, FieldConflict, FieldPath, Origin};
use crate::domain::session::{ConversationSession, SessionStatus};

#[derive(Debug, Clone)]
pub struct GetSessionStatusQuery {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub value: serde_json::Value,
    pub confidence: f32,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl From<&AcceptedField> for FieldView {
    fn from(field: &AcceptedField) -> Self {
        Self {
            value: field.value.to_json(),
            confidence: field.confidence.value(),
            origin: field.origin,
            excerpt: field.excerpt.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictView {
    pub field: FieldPath,
    pub current: FieldView,
    pub proposed: FieldView,
}

impl From<&FieldConflict> for ConflictView {
    fn from(conflict: &FieldConflict) -> Self {
        Self {
            field: conflict.field,
            current: FieldView::from(&conflict.current),
            proposed: FieldView::from(&conflict.proposed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub seq: u64,
    pub role: Role,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<&ConversationMessage> for MessageView {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            seq: message.seq(),
            role: message.role(),
            content: message.content().to_string(),
            created_at: *message.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadView {
    pub upload_id: UploadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub format: DocumentFormat,
    pub size_bytes: usize,
    pub status: ProcessingStatus,
    pub fields_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractionError>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&DocumentUpload> for UploadView {
    fn from(upload: &DocumentUpload) -> Self {
        Self {
            upload_id: upload.id(),
            file_name: upload.file_name().map(str::to_string),
            format: upload.format(),
            size_bytes: upload.size_bytes(),
            status: upload.status(),
            fields_found: upload.fields().map_or(0, |fields| fields.len()),
            error: upload.error().cloned(),
            created_at: *upload.created_at(),
            updated_at: *upload.updated_at(),
        }
    }
}

/// Everything a caller can see about a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(flatten)]
    pub completion: CompletionView,
    pub fields: BTreeMap<FieldPath, FieldView>,
    pub conflicts: Vec<ConflictView>,
    /// User-visible messages only; tool traffic and notes are omitted.
    pub messages: Vec<MessageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub constraints: Vec<String>,
    pub uploads: Vec<UploadView>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SessionSnapshot {
    pub fn capture(session: &ConversationSession, uploads: &[DocumentUpload]) -> Self {
        let draft = session.draft();
        Self {
            session_id: session.id(),
            status: session.status(),
            owner_tax_id: session.owner_tax_id().map(str::to_string),
            project_id: session.project_id().cloned(),
            completion: CompletionView::from(&session.completion()),
            fields: draft.fields().map(|(path, field)| (path, FieldView::from(field))).collect(),
            conflicts: draft.conflicts().map(ConflictView::from).collect(),
            messages: session
                .history()
                .iter()
                .filter(|message| message.role().is_user_visible() && message.tool_calls().is_empty())
                .map(MessageView::from)
                .collect(),
            summary: session.summary().map(|summary| summary.text().to_string()),
            constraints: session
                .constraints()
                .entries()
                .iter()
                .map(|constraint| constraint.text.clone())
                .collect(),
            uploads: uploads.iter().map(UploadView::from).collect(),
            created_at: *session.created_at(),
            updated_at: *session.updated_at(),
        }
    }
}

pub struct GetSessionStatusHandler {
    registry: SessionRegistry,
}

impl GetSessionStatusHandler {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetSessionStatusQuery) -> Result<SessionSnapshot, IngestionError> {
        let handle = self.registry.get(query.session_id).await?;
        let uploads = handle.uploads().await;
        let session = handle.lock().await;
        Ok(SessionSnapshot::capture(&session, &uploads))
    }
}
