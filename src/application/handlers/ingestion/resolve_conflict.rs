//! ResolveConflictHandler - the user picks between two disagreeing values.

use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::SessionRegistry;
use crate::domain::foundation::SessionId;
use crate::domain::project::{ConflictResolution, FieldMerger, FieldPath, FieldValue};
use crate::domain::session::SessionStatus;

#[derive(Debug, Clone, Copy)]
pub struct ResolveConflictCommand {
    pub session_id: SessionId,
    pub field: FieldPath,
    pub resolution: ConflictResolution,
}

#[derive(Debug, Clone)]
pub struct ResolveConflictResult {
    pub field: FieldPath,
    /// The value the draft holds after resolution.
    pub value: Option<FieldValue>,
    pub status: SessionStatus,
    pub completion: CompletionView,
}

pub struct ResolveConflictHandler {
    registry: SessionRegistry,
    merger: FieldMerger,
    auto_finalize: bool,
}

impl ResolveConflictHandler {
    pub fn new(registry: SessionRegistry, merger: FieldMerger, auto_finalize: bool) -> Self {
        Self {
            registry,
            merger,
            auto_finalize,
        }
    }

    #[tracing::instrument(skip(self), fields(session_id = %cmd.session_id, field = %cmd.field.as_str()))]
    pub async fn handle(&self, cmd: ResolveConflictCommand) -> Result<ResolveConflictResult, IngestionError> {
        let handle = self.registry.get(cmd.session_id).await?;
        let mut session = handle.lock().await;
        session.resolve_conflict(&self.merger, cmd.field, cmd.resolution)?;
        if self.auto_finalize && session.try_auto_complete() {
            tracing::info!("draft complete after conflict resolution, session finalized");
        }
        tracing::info!(resolution = ?cmd.resolution, "conflict resolved");

        Ok(ResolveConflictResult {
            field: cmd.field,
            value: session.draft().value(cmd.field).cloned(),
            status: session.status(),
            completion: CompletionView::from(&session.completion()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Confidence;
    use crate::domain::project::{ExtractedFieldSet, FieldCandidate, MergeError, Origin};
    use crate::domain::session::{ConversationSession, SessionError};

    fn price(n: f64, confidence: f32) -> ExtractedFieldSet {
        ExtractedFieldSet::new().with(
            FieldPath::PriceMax,
            FieldCandidate::new(FieldValue::Decimal(n), Confidence::new(confidence), Origin::Document),
        )
    }

    async fn conflicted_session(registry: &SessionRegistry) -> SessionId {
        let merger = FieldMerger::default();
        let mut session = ConversationSession::new(None, 50);
        session.merge(&merger, &price(300_000_000.0, 0.7)).unwrap();
        let outcome = session.merge(&merger, &price(450_000_000.0, 0.9)).unwrap();
        assert_eq!(outcome.conflicts, vec![FieldPath::PriceMax]);
        registry.insert(session).await.id()
    }

    fn command(session_id: SessionId, resolution: ConflictResolution) -> ResolveConflictCommand {
        ResolveConflictCommand {
            session_id,
            field: FieldPath::PriceMax,
            resolution,
        }
    }

    #[tokio::test]
    async fn accepting_the_proposal_replaces_the_value() {
        let registry = SessionRegistry::new();
        let id = conflicted_session(&registry).await;
        let handler = ResolveConflictHandler::new(registry, FieldMerger::default(), false);

        let result = handler
            .handle(command(id, ConflictResolution::AcceptProposed))
            .await
            .unwrap();

        assert_eq!(result.value, Some(FieldValue::Decimal(450_000_000.0)));
        assert!(result.completion.conflicted_fields.is_empty());
    }

    #[tokio::test]
    async fn keeping_current_clears_the_conflict() {
        let registry = SessionRegistry::new();
        let id = conflicted_session(&registry).await;
        let handler = ResolveConflictHandler::new(registry, FieldMerger::default(), false);

        let result = handler.handle(command(id, ConflictResolution::KeepCurrent)).await.unwrap();

        assert_eq!(result.value, Some(FieldValue::Decimal(300_000_000.0)));
        assert!(result.completion.conflicted_fields.is_empty());
    }

    #[tokio::test]
    async fn resolving_twice_fails() {
        let registry = SessionRegistry::new();
        let id = conflicted_session(&registry).await;
        let handler = ResolveConflictHandler::new(registry, FieldMerger::default(), false);
        handler.handle(command(id, ConflictResolution::KeepCurrent)).await.unwrap();

        let err = handler.handle(command(id, ConflictResolution::KeepCurrent)).await.unwrap_err();

        assert_eq!(
            err,
            IngestionError::Session(SessionError::Merge(MergeError::NoConflict(FieldPath::PriceMax)))
        );
    }
}
