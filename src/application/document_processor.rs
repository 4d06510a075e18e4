//! Runs one admitted upload through flattening, extraction and merge.
//!
//! Used inline by synchronous uploads and from a spawned task for
//! background ones; the upload record on the session handle is the
//! pollable status in both cases.

use std::sync::Arc;

use super::errors::IngestionError;
use super::field_extractor::FieldExtractor;
use super::progress::{merge_facts, CompletionView};
use super::registry::SessionHandle;
use crate::domain::extraction::{DocumentFormat, DocumentUpload, ExtractionError, FlatText};
use crate::domain::foundation::{StateMachine, UploadId};
use crate::domain::project::{ExtractedFieldSet, FieldMerger, FieldPath, Origin};
use crate::domain::response::ResponseGenerator;
use crate::ports::DocumentTextReader;

/// What processing an upload produced.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub upload: DocumentUpload,
    pub reply: String,
    pub merged: Vec<FieldPath>,
    pub conflicts: Vec<FieldPath>,
    pub completion: CompletionView,
}

#[derive(Clone)]
pub struct DocumentProcessor {
    reader: Arc<dyn DocumentTextReader>,
    extractor: Arc<FieldExtractor>,
    merger: FieldMerger,
    generator: ResponseGenerator,
    auto_finalize: bool,
}

impl DocumentProcessor {
    pub fn new(
        reader: Arc<dyn DocumentTextReader>,
        extractor: Arc<FieldExtractor>,
        merger: FieldMerger,
        auto_finalize: bool,
    ) -> Self {
        Self {
            reader,
            extractor,
            merger,
            generator: ResponseGenerator::new(),
            auto_finalize,
        }
    }

    #[tracing::instrument(skip(self, handle, bytes), fields(session_id = %handle.id(), upload_id = %upload_id))]
    pub async fn process(
        &self,
        handle: Arc<SessionHandle>,
        upload_id: UploadId,
        format: DocumentFormat,
        bytes: Vec<u8>,
    ) -> Result<UploadReport, IngestionError> {
        handle
            .update_upload(upload_id, |upload| {
                if let Err(err) = upload.start_processing() {
                    tracing::warn!(error = %err, "upload was not pending");
                }
            })
            .await
            .ok_or(IngestionError::UploadNotFound(upload_id))?;

        let fields = match self.flatten(format, bytes).await {
            Ok(text) => Ok(self.extractor.extract(handle.id(), &text, Origin::Document, true).await),
            Err(err) => Err(err),
        };

        let mut session = handle.lock().await;
        if handle.is_cancelled() || session.status().is_terminal() {
            tracing::info!("session closed during extraction, discarding fields");
            let upload = self.settle(&handle, upload_id, Err(ExtractionError::Cancelled)).await?;
            return Ok(UploadReport {
                upload,
                reply: String::new(),
                merged: Vec::new(),
                conflicts: Vec::new(),
                completion: CompletionView::from(&session.completion()),
            });
        }

        let fields = match fields {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!(error = %err, "document extraction failed");
                let reply = err.user_message();
                let upload = self.settle(&handle, upload_id, Err(err)).await?;
                session.record_assistant_message(reply.clone());
                return Ok(UploadReport {
                    upload,
                    reply,
                    merged: Vec::new(),
                    conflicts: Vec::new(),
                    completion: CompletionView::from(&session.completion()),
                });
            }
        };

        let outcome = session.merge(&self.merger, &fields)?;
        let upload = self.settle(&handle, upload_id, Ok(fields.clone())).await?;

        let mut facts = merge_facts(&outcome);
        if fields.is_empty() {
            facts
                .errors
                .push("I read the document but couldn't find any project details in it.".to_string());
        }
        if self.auto_finalize && session.try_auto_complete() {
            facts.completed = true;
        }
        facts.project_id = session.project_id().cloned();

        let completion = session.completion();
        let plan = self.generator.plan(session.draft(), &completion, &facts);
        let reply = self.generator.render(&plan, session.draft(), &facts);
        session.record_assistant_message(reply.clone());

        tracing::info!(
            found = fields.len(),
            accepted = outcome.accepted.len(),
            conflicts = outcome.conflicts.len(),
            completion = completion.percentage.value(),
            "document merged into draft"
        );

        Ok(UploadReport {
            upload,
            reply,
            merged: outcome.accepted,
            conflicts: outcome.conflicts,
            completion: CompletionView::from(&completion),
        })
    }

    async fn flatten(&self, format: DocumentFormat, bytes: Vec<u8>) -> Result<FlatText, ExtractionError> {
        let reader = Arc::clone(&self.reader);
        match tokio::task::spawn_blocking(move || reader.read(format, &bytes)).await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(ExtractionError::Cancelled),
            Err(err) => Err(ExtractionError::parse_failure(format.extension(), err.to_string())),
        }
    }

    async fn settle(
        &self,
        handle: &SessionHandle,
        upload_id: UploadId,
        result: Result<ExtractedFieldSet, ExtractionError>,
    ) -> Result<DocumentUpload, IngestionError> {
        handle
            .update_upload(upload_id, move |upload| {
                let transition = match result {
                    Ok(fields) => upload.complete(fields),
                    Err(err) => upload.fail(err),
                };
                if let Err(err) = transition {
                    tracing::warn!(error = %err, "upload already settled");
                }
            })
            .await
            .ok_or(IngestionError::UploadNotFound(upload_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::domain::extraction::{ConfidencePolicy, ProcessingStatus, RawDocument};
    use crate::domain::project::{FieldValue, MergeConfig};
    use crate::domain::session::ConversationSession;

    /// Reader that returns canned text regardless of format.
    struct CannedReader(Result<&'static str, ExtractionError>);

    impl DocumentTextReader for CannedReader {
        fn read(&self, _format: DocumentFormat, _bytes: &[u8]) -> Result<FlatText, ExtractionError> {
            self.0.clone().map(FlatText::from_text)
        }
    }

    fn processor(reader: CannedReader) -> DocumentProcessor {
        let extractor = FieldExtractor::new(Arc::new(MockAIProvider::new()), ConfidencePolicy::default(), 4000);
        DocumentProcessor::new(
            Arc::new(reader),
            Arc::new(extractor),
            FieldMerger::new(MergeConfig::default()),
            false,
        )
    }

    async fn admitted(handle: &SessionHandle) -> UploadId {
        let raw = RawDocument::new("application/pdf", b"%PDF-1.4".to_vec()).with_file_name("brochure.pdf");
        let upload = DocumentUpload::new(handle.id(), &raw, DocumentFormat::Pdf);
        let id = upload.id();
        handle.put_upload(upload).await;
        handle.lock().await.accept_input().unwrap();
        id
    }

    #[tokio::test]
    async fn extracted_fields_land_in_the_draft() {
        let handle = Arc::new(SessionHandle::new(ConversationSession::new(None, 50)));
        let id = admitted(&handle).await;
        let processor = processor(CannedReader(Ok("Proyecto: Torre Alameda\nCiudad: Bogotá")));

        let report = processor
            .process(Arc::clone(&handle), id, DocumentFormat::Pdf, b"%PDF-1.4".to_vec())
            .await
            .unwrap();

        assert_eq!(report.upload.status(), ProcessingStatus::Completed);
        assert!(report.merged.contains(&FieldPath::Name));
        assert!(!report.completion.missing_fields.contains(&FieldPath::City));
        let session = handle.lock().await;
        assert_eq!(
            session.draft().value(FieldPath::City),
            Some(&FieldValue::Text("Bogotá".to_string()))
        );
        assert_eq!(session.history().last().unwrap().content(), report.reply);
    }

    #[tokio::test]
    async fn unreadable_document_is_reported_in_the_chat() {
        let handle = Arc::new(SessionHandle::new(ConversationSession::new(None, 50)));
        let id = admitted(&handle).await;
        let processor = processor(CannedReader(Err(ExtractionError::EmptyDocument)));

        let report = processor
            .process(Arc::clone(&handle), id, DocumentFormat::Pdf, Vec::new())
            .await
            .unwrap();

        assert_eq!(report.upload.status(), ProcessingStatus::Failed);
        assert_eq!(report.upload.error(), Some(&ExtractionError::EmptyDocument));
        assert_eq!(report.reply, ExtractionError::EmptyDocument.user_message());
        assert!(handle.lock().await.status().accepts_input());
    }

    #[tokio::test]
    async fn cancelled_session_discards_extraction() {
        let handle = Arc::new(SessionHandle::new(ConversationSession::new(None, 50)));
        let id = admitted(&handle).await;
        handle.mark_cancelled();
        let processor = processor(CannedReader(Ok("Proyecto: Torre Alameda")));

        let report = processor
            .process(Arc::clone(&handle), id, DocumentFormat::Pdf, Vec::new())
            .await
            .unwrap();

        assert_eq!(report.upload.error(), Some(&ExtractionError::Cancelled));
        assert!(handle.lock().await.draft().value(FieldPath::Name).is_none());
    }
}
