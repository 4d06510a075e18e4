//! GenerateDescriptionHandler - drafts a project description on request.

use std::sync::Arc;

use crate::application::description::{DescriptionSource, DescriptionWriter};
use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::SessionRegistry;
use crate::domain::extraction::ConfidencePolicy;
use crate::domain::foundation::{SessionId, StateMachine};
use crate::domain::project::{ExtractedFieldSet, FieldCandidate, FieldMerger, FieldPath, FieldValue, Origin};
use crate::domain::session::SessionError;

#[derive(Debug, Clone, Copy)]
pub struct GenerateDescriptionCommand {
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct GenerateDescriptionResult {
    pub description: String,
    pub source: DescriptionSource,
    /// False when the draft already had a description; it is never replaced.
    pub merged: bool,
    pub completion: CompletionView,
}

pub struct GenerateDescriptionHandler {
    registry: SessionRegistry,
    writer: Arc<DescriptionWriter>,
    merger: FieldMerger,
    confidence: ConfidencePolicy,
}

impl GenerateDescriptionHandler {
    pub fn new(
        registry: SessionRegistry,
        writer: Arc<DescriptionWriter>,
        merger: FieldMerger,
        confidence: ConfidencePolicy,
    ) -> Self {
        Self {
            registry,
            writer,
            merger,
            confidence,
        }
    }

    #[tracing::instrument(skip(self), fields(session_id = %cmd.session_id))]
    pub async fn handle(&self, cmd: GenerateDescriptionCommand) -> Result<GenerateDescriptionResult, IngestionError> {
        let handle = self.registry.get(cmd.session_id).await?;
        let mut session = handle.lock().await;
        if session.status().is_terminal() {
            return Err(SessionError::DraftLocked(session.status()).into());
        }

        let drafted = self.writer.write(session.id(), session.draft()).await;

        let mut merged = false;
        if !session.draft().contains(FieldPath::Description) {
            let value = FieldValue::parse_text(FieldPath::Description, &drafted.text)?;
            let fields = ExtractedFieldSet::new().with(
                FieldPath::Description,
                FieldCandidate::new(value, self.confidence.generated_text(), Origin::Tool),
            );
            merged = !session.merge(&self.merger, &fields)?.accepted.is_empty();
        }
        tracing::info!(source = ?drafted.source, merged, "description drafted");

        Ok(GenerateDescriptionResult {
            description: drafted.text,
            source: drafted.source,
            merged,
            completion: CompletionView::from(&session.completion()),
        })
    }
}
