//! StartSessionHandler - opens a new ingestion session.

use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::SessionRegistry;
use crate::domain::extraction::ConfidencePolicy;
use crate::domain::foundation::SessionId;
use crate::domain::project::{ExtractedFieldSet, FieldCandidate, FieldMerger, FieldPath, FieldValue, Origin};
use crate::domain::response::OPENING_MESSAGE;
use crate::domain::session::{ConversationSession, SessionStatus};

#[derive(Debug, Clone, Default)]
pub struct StartSessionCommand {
    /// Tax id of the owner, when the caller already knows it.
    pub owner_tax_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartSessionResult {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub greeting: String,
    pub completion: CompletionView,
}

pub struct StartSessionHandler {
    registry: SessionRegistry,
    merger: FieldMerger,
    confidence: ConfidencePolicy,
    max_history: usize,
}

impl StartSessionHandler {
    pub fn new(registry: SessionRegistry, merger: FieldMerger, confidence: ConfidencePolicy, max_history: usize) -> Self {
        Self {
            registry,
            merger,
            confidence,
            max_history,
        }
    }

    #[tracing::instrument(skip(self, cmd))]
    pub async fn handle(&self, cmd: StartSessionCommand) -> Result<StartSessionResult, IngestionError> {
        let owner = cmd
            .owner_tax_id
            .as_deref()
            .map(str::trim)
            .filter(|tax_id| !tax_id.is_empty())
            .map(|tax_id| FieldValue::parse_text(FieldPath::OwnerTaxId, tax_id).map(|value| (tax_id.to_string(), value)))
            .transpose()?;

        let mut session = ConversationSession::new(owner.as_ref().map(|(raw, _)| raw.clone()), self.max_history);
        if let Some((_, value)) = owner {
            let fields = ExtractedFieldSet::new().with(
                FieldPath::OwnerTaxId,
                FieldCandidate::new(value, self.confidence.user(), Origin::Conversation),
            );
            session.merge(&self.merger, &fields)?;
        }
        session.record_assistant_message(OPENING_MESSAGE);

        let result = StartSessionResult {
            session_id: session.id(),
            status: session.status(),
            greeting: OPENING_MESSAGE.to_string(),
            completion: CompletionView::from(&session.completion()),
        };
        self.registry.insert(session).await;
        tracing::info!(session_id = %result.session_id, "ingestion session started");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::MergeConfig;

    fn handler(registry: SessionRegistry) -> StartSessionHandler {
        StartSessionHandler::new(registry, FieldMerger::new(MergeConfig::default()), ConfidencePolicy::default(), 50)
    }

    #[tokio::test]
    async fn new_session_is_created_and_greets() {
        let registry = SessionRegistry::new();

        let result = handler(registry.clone()).handle(StartSessionCommand::default()).await.unwrap();

        assert_eq!(result.status, SessionStatus::Created);
        assert_eq!(result.greeting, OPENING_MESSAGE);
        let handle = registry.get(result.session_id).await.unwrap();
        assert_eq!(handle.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn owner_tax_id_is_stored_and_merged() {
        let registry = SessionRegistry::new();
        let cmd = StartSessionCommand {
            owner_tax_id: Some(" 900123456-7 ".to_string()),
        };

        let result = handler(registry.clone()).handle(cmd).await.unwrap();

        assert!(!result.completion.missing_fields.contains(&FieldPath::OwnerTaxId));
        let handle = registry.get(result.session_id).await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.owner_tax_id(), Some("900123456-7"));
        assert_eq!(session.draft().get(FieldPath::OwnerTaxId).unwrap().origin, Origin::Conversation);
    }

    #[tokio::test]
    async fn malformed_tax_id_is_rejected() {
        let registry = SessionRegistry::new();
        let cmd = StartSessionCommand {
            owner_tax_id: Some("not-a-nit".to_string()),
        };

        let err = handler(registry.clone()).handle(cmd).await.unwrap_err();

        assert!(matches!(err, IngestionError::Validation(_)));
        assert!(registry.is_empty().await);
    }
}
