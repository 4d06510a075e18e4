//! ChangeSessionStateHandler - pause, resume, cancel and finalize.
//!
//! Cancel raises the handle's flag before waiting for the lock, so a turn
//! or extraction in flight stops at its next checkpoint and throws its
//! results away. Background extractions are aborted only once the session
//! has actually moved to `Cancelled`; a refused cancel lowers the flag and
//! leaves them running.

use serde::{Deserialize, Serialize};

use crate::application::errors::IngestionError;
use crate::application::progress::CompletionView;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::domain::extraction::ExtractionError;
use crate::domain::foundation::{ProjectId, SessionId, StateMachine};
use crate::domain::session::{FinalizeOutcome, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Pause,
    Resume,
    Cancel,
    Finalize,
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeSessionStateCommand {
    pub session_id: SessionId,
    pub action: SessionAction,
}

#[derive(Debug, Clone)]
pub struct ChangeSessionStateResult {
    pub status: SessionStatus,
    pub project_id: Option<ProjectId>,
    pub completion: CompletionView,
}

pub struct ChangeSessionStateHandler {
    registry: SessionRegistry,
}

impl ChangeSessionStateHandler {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    #[tracing::instrument(skip(self), fields(session_id = %cmd.session_id, action = ?cmd.action))]
    pub async fn handle(&self, cmd: ChangeSessionStateCommand) -> Result<ChangeSessionStateResult, IngestionError> {
        let handle = self.registry.get(cmd.session_id).await?;

        if cmd.action == SessionAction::Cancel {
            handle.mark_cancelled();
        }

        let mut session = handle.lock().await;
        let from = session.status();
        let changed = match cmd.action {
            SessionAction::Pause => session.pause(),
            SessionAction::Resume => session.resume(),
            SessionAction::Cancel => session.cancel(),
            SessionAction::Finalize => session.finalize().map(|outcome| {
                if outcome == FinalizeOutcome::AlreadyCompleted {
                    tracing::debug!("session already completed");
                }
            }),
        };
        if let Err(err) = changed {
            if cmd.action == SessionAction::Cancel && !session.status().is_terminal() {
                handle.clear_cancelled();
            }
            return Err(err.into());
        }

        tracing::info!(%from, to = %session.status(), "session state changed");
        let result = ChangeSessionStateResult {
            status: session.status(),
            project_id: session.project_id().cloned(),
            completion: CompletionView::from(&session.completion()),
        };
        drop(session);

        if cmd.action == SessionAction::Cancel {
            abort_extractions(&handle).await;
        }
        Ok(result)
    }
}

async fn abort_extractions(handle: &SessionHandle) {
    let aborted = handle.abort_all_tasks();
    for upload_id in &aborted {
        handle
            .update_upload(*upload_id, |upload| {
                if let Err(err) = upload.fail(ExtractionError::Cancelled) {
                    tracing::debug!(upload_id = %upload.id(), error = %err, "upload already settled");
                }
            })
            .await;
    }
    if !aborted.is_empty() {
        tracing::info!(count = aborted.len(), "background extractions aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{DocumentFormat, DocumentUpload, ProcessingStatus, RawDocument};
    use crate::domain::session::{ConversationSession, SessionError};
    use std::time::Duration;

    async fn active_session(registry: &SessionRegistry) -> SessionId {
        let mut session = ConversationSession::new(None, 50);
        session.accept_input().unwrap();
        registry.insert(session).await.id()
    }

    fn command(session_id: SessionId, action: SessionAction) -> ChangeSessionStateCommand {
        ChangeSessionStateCommand { session_id, action }
    }

    #[tokio::test]
    async fn pause_then_resume() {
        let registry = SessionRegistry::new();
        let id = active_session(&registry).await;
        let handler = ChangeSessionStateHandler::new(registry);

        let paused = handler.handle(command(id, SessionAction::Pause)).await.unwrap();
        let resumed = handler.handle(command(id, SessionAction::Resume)).await.unwrap();

        assert_eq!(paused.status, SessionStatus::Paused);
        assert_eq!(resumed.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn finalize_incomplete_draft_lists_missing_fields() {
        let registry = SessionRegistry::new();
        let id = active_session(&registry).await;

        let err = ChangeSessionStateHandler::new(registry)
            .handle(command(id, SessionAction::Finalize))
            .await
            .unwrap_err();

        match err {
            IngestionError::Session(SessionError::InvalidTransition { missing, .. }) => {
                assert!(!missing.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_aborts_background_extraction() {
        let registry = SessionRegistry::new();
        let id = active_session(&registry).await;
        let handle = registry.get(id).await.unwrap();
        let raw = RawDocument::new("application/pdf", b"%PDF".to_vec());
        let upload = DocumentUpload::new(id, &raw, DocumentFormat::Pdf);
        let upload_id = upload.id();
        handle.put_upload(upload).await;
        handle.track_task(upload_id, tokio::spawn(tokio::time::sleep(Duration::from_secs(30))));

        let result = ChangeSessionStateHandler::new(registry)
            .handle(command(id, SessionAction::Cancel))
            .await
            .unwrap();

        assert_eq!(result.status, SessionStatus::Cancelled);
        assert!(handle.is_cancelled());
        let upload = handle.upload(upload_id).await.unwrap();
        assert_eq!(upload.status(), ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn refused_cancel_leaves_extractions_running() {
        let registry = SessionRegistry::new();
        let mut session = ConversationSession::new(None, 50);
        session.accept_input().unwrap();
        session.cancel().unwrap();
        let id = registry.insert(session).await.id();
        let handle = registry.get(id).await.unwrap();
        let raw = RawDocument::new("application/pdf", b"%PDF late".to_vec());
        let upload = DocumentUpload::new(id, &raw, DocumentFormat::Pdf);
        let upload_id = upload.id();
        handle.put_upload(upload).await;
        handle.track_task(upload_id, tokio::spawn(tokio::time::sleep(Duration::from_secs(30))));

        let err = ChangeSessionStateHandler::new(registry)
            .handle(command(id, SessionAction::Cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::Session(SessionError::InvalidTransition { .. })));
        assert_eq!(handle.upload(upload_id).await.unwrap().status(), ProcessingStatus::Pending);
        assert!(handle.abort_task(upload_id), "extraction task should still be running");
    }

    #[tokio::test]
    async fn refused_cancel_clears_the_flag() {
        let registry = SessionRegistry::new();
        let session = ConversationSession::new(None, 50);
        let id = registry.insert(session).await.id();

        let err = ChangeSessionStateHandler::new(registry.clone())
            .handle(command(id, SessionAction::Cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::Session(SessionError::InvalidTransition { .. })));
        assert!(!registry.get(id).await.unwrap().is_cancelled());
    }
}
