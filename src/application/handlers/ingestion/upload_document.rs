//! Upload handlers - admit a document, look it up, cancel it.
//!
//! Admission (type and size) happens under the session lock. Extraction
//! runs inline or in a background task; either way the upload record on
//! the session handle is the status a client polls.

use std::sync::Arc;

use crate::application::document_processor::DocumentProcessor;
use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::SessionRegistry;
use crate::domain::extraction::{DocumentUpload, ExtractionError, RawDocument, UploadPolicy};
use crate::domain::foundation::{SessionId, UploadId};
use crate::domain::project::FieldPath;

#[derive(Debug, Clone)]
pub struct UploadDocumentCommand {
    pub session_id: SessionId,
    pub document: RawDocument,
    /// Return right after admission and extract in the background.
    pub run_async: bool,
}

#[derive(Debug, Clone)]
pub struct UploadDocumentResult {
    /// None when the document was refused at admission.
    pub upload: Option<DocumentUpload>,
    /// The same content was already uploaded to this session.
    pub duplicate: bool,
    pub reply: String,
    pub merged: Vec<FieldPath>,
    pub completion: CompletionView,
}

pub struct UploadDocumentHandler {
    registry: SessionRegistry,
    processor: DocumentProcessor,
    policy: UploadPolicy,
}

impl UploadDocumentHandler {
    pub fn new(registry: SessionRegistry, processor: DocumentProcessor, policy: UploadPolicy) -> Self {
        Self {
            registry,
            processor,
            policy,
        }
    }

    #[tracing::instrument(skip(self, cmd), fields(session_id = %cmd.session_id, run_async = cmd.run_async))]
    pub async fn handle(&self, cmd: UploadDocumentCommand) -> Result<UploadDocumentResult, IngestionError> {
        let handle = self.registry.get(cmd.session_id).await?;
        let document = cmd.document;

        let (upload, format) = {
            let mut session = handle.lock().await;
            session.accept_input()?;

            let format = match self.policy.admit(&document) {
                Ok(format) => format,
                Err(err) => {
                    tracing::info!(error = %err, "document refused at admission");
                    let reply = err.user_message();
                    session.record_assistant_message(reply.clone());
                    return Ok(UploadDocumentResult {
                        upload: None,
                        duplicate: false,
                        reply,
                        merged: Vec::new(),
                        completion: CompletionView::from(&session.completion()),
                    });
                }
            };

            if let Some(existing) = handle.find_by_fingerprint(&document.fingerprint()).await {
                tracing::info!(upload_id = %existing.id(), "duplicate upload ignored");
                let reply = format!(
                    "I already have {}; nothing new to read.",
                    existing.file_name().unwrap_or("that document")
                );
                session.record_assistant_message(reply.clone());
                return Ok(UploadDocumentResult {
                    upload: Some(existing),
                    duplicate: true,
                    reply,
                    merged: Vec::new(),
                    completion: CompletionView::from(&session.completion()),
                });
            }

            let upload = DocumentUpload::new(handle.id(), &document, format);
            session.record_system_note(format!(
                "document uploaded: {} ({}, {} bytes)",
                upload.file_name().unwrap_or("unnamed"),
                format,
                upload.size_bytes()
            ));
            handle.put_upload(upload.clone()).await;
            (upload, format)
        };

        if !cmd.run_async {
            let report = self
                .processor
                .process(Arc::clone(&handle), upload.id(), format, document.bytes)
                .await?;
            return Ok(UploadDocumentResult {
                upload: Some(report.upload),
                duplicate: false,
                reply: report.reply,
                merged: report.merged,
                completion: report.completion,
            });
        }

        let upload_id = upload.id();
        let processor = self.processor.clone();
        let task_handle = Arc::clone(&handle);
        let task = tokio::spawn(async move {
            if let Err(err) = processor
                .process(Arc::clone(&task_handle), upload_id, format, document.bytes)
                .await
            {
                tracing::warn!(upload_id = %upload_id, error = %err, "background extraction failed");
            }
            task_handle.finish_task(upload_id);
        });
        handle.track_task(upload_id, task);

        let mut session = handle.lock().await;
        let reply = format!(
            "I'm reading {} now. I'll add what I find to the project draft.",
            upload.file_name().unwrap_or("the document")
        );
        session.record_assistant_message(reply.clone());
        Ok(UploadDocumentResult {
            upload: Some(upload),
            duplicate: false,
            reply,
            merged: Vec::new(),
            completion: CompletionView::from(&session.completion()),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Lookup and cancellation
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct GetUploadQuery {
    pub session_id: SessionId,
    pub upload_id: UploadId,
}

pub struct GetUploadHandler {
    registry: SessionRegistry,
}

impl GetUploadHandler {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetUploadQuery) -> Result<DocumentUpload, IngestionError> {
        let handle = self.registry.get(query.session_id).await?;
        handle
            .upload(query.upload_id)
            .await
            .ok_or(IngestionError::UploadNotFound(query.upload_id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CancelUploadCommand {
    pub session_id: SessionId,
    pub upload_id: UploadId,
}

pub struct CancelUploadHandler {
    registry: SessionRegistry,
}

impl CancelUploadHandler {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Stops a running extraction. Settled uploads are returned unchanged.
    pub async fn handle(&self, cmd: CancelUploadCommand) -> Result<DocumentUpload, IngestionError> {
        let handle = self.registry.get(cmd.session_id).await?;
        let aborted = handle.abort_task(cmd.upload_id);
        let upload = handle
            .update_upload(cmd.upload_id, |upload| {
                if upload.fail(ExtractionError::Cancelled).is_err() {
                    tracing::debug!(upload_id = %upload.id(), status = %upload.status(), "upload already settled");
                }
            })
            .await
            .ok_or(IngestionError::UploadNotFound(cmd.upload_id))?;
        tracing::info!(upload_id = %cmd.upload_id, aborted, status = %upload.status(), "upload cancel requested");
        Ok(upload)
    }
}
