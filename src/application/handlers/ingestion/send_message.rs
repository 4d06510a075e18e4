//! SendMessageHandler - one conversational turn.
//!
//! A turn runs under the session lock:
//! 1. record the user message and merge any values it states
//! 2. let the model call tools for up to `max_rounds` rounds
//! 3. pick the reply, either the model's grounded text or the template

use std::sync::Arc;

use crate::application::context_builder::{to_request_messages, ContextBuilder};
use crate::application::errors::IngestionError;
use crate::application::field_extractor::FieldExtractor;
use crate::application::progress::{merge_facts, CompletionView};
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::settings::IngestionSettings;
use crate::application::tool_orchestrator::{ToolExecution, ToolOrchestrator};
use crate::domain::conversation::{FactSheet, Role};
use crate::domain::extraction::FlatText;
use crate::domain::foundation::SessionId;
use crate::domain::project::{FieldMerger, FieldPath, Origin};
use crate::domain::response::{turn_instructions, GroundingEvidence, ResponseGenerator, TurnFacts};
use crate::domain::session::{ConversationSession, SessionStatus};
use crate::domain::tools::catalog;
use crate::ports::{AIProvider, CompletionRequest, RequestMetadata, RequestPurpose};

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub session_id: SessionId,
    pub content: String,
}

impl SendMessageCommand {
    pub fn new(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            session_id,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub reply: String,
    pub status: SessionStatus,
    pub completion: CompletionView,
    /// Fields accepted during this turn, from the message or from tools.
    pub accepted: Vec<FieldPath>,
    pub tool_calls: Vec<ToolExecution>,
}

pub struct SendMessageHandler {
    registry: SessionRegistry,
    ai: Arc<dyn AIProvider>,
    context: Arc<ContextBuilder>,
    extractor: Arc<FieldExtractor>,
    orchestrator: Arc<ToolOrchestrator>,
    merger: FieldMerger,
    generator: ResponseGenerator,
    settings: IngestionSettings,
}

impl SendMessageHandler {
    pub fn new(
        registry: SessionRegistry,
        ai: Arc<dyn AIProvider>,
        context: Arc<ContextBuilder>,
        extractor: Arc<FieldExtractor>,
        orchestrator: Arc<ToolOrchestrator>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            registry,
            ai,
            context,
            extractor,
            orchestrator,
            merger: FieldMerger::new(settings.merge),
            generator: ResponseGenerator::new(),
            settings,
        }
    }

    #[tracing::instrument(skip(self, cmd), fields(session_id = %cmd.session_id))]
    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<SendMessageResult, IngestionError> {
        let content = cmd.content.trim();
        if content.is_empty() {
            return Err(IngestionError::EmptyMessage);
        }

        let handle = self.registry.get(cmd.session_id).await?;
        let mut session = handle.lock().await;
        session.accept_input()?;
        session.record_user_message(content);

        // Direct statements
        let statements = self
            .extractor
            .extract(
                session.id(),
                &FlatText::from_text(content),
                Origin::Conversation,
                self.settings.model_assisted_statements,
            )
            .await;
        let mut facts = if statements.is_empty() {
            TurnFacts::default()
        } else {
            let outcome = session.merge(&self.merger, &statements)?;
            tracing::debug!(accepted = outcome.accepted.len(), "statement values merged");
            merge_facts(&outcome)
        };
        self.try_finalize(&mut session, &mut facts);

        // Model and tools
        let mut tool_calls = Vec::new();
        let model_reply = if facts.completed {
            None
        } else {
            self.converse(&handle, &mut session, &mut facts, &mut tool_calls).await?
        };
        self.try_finalize(&mut session, &mut facts);
        facts.project_id = session.project_id().cloned();

        // Reply
        let completion = session.completion();
        let plan = self.generator.plan(session.draft(), &completion, &facts);
        let evidence = evidence_for(&session);
        let reply = self
            .generator
            .choose_reply(model_reply.as_deref(), &evidence, &plan, session.draft(), &facts);
        session.record_assistant_message(reply.clone());

        tracing::info!(
            accepted = facts.newly_accepted.len(),
            tools = tool_calls.len(),
            completion = completion.percentage.value(),
            "turn processed"
        );

        Ok(SendMessageResult {
            reply,
            status: session.status(),
            completion: CompletionView::from(&completion),
            accepted: facts.newly_accepted,
            tool_calls,
        })
    }

    /// Runs model rounds until the model answers in text or the round
    /// budget is spent. Returns the model's text, if any. Provider failures
    /// degrade to the template reply.
    async fn converse(
        &self,
        handle: &SessionHandle,
        session: &mut ConversationSession,
        facts: &mut TurnFacts,
        executions: &mut Vec<ToolExecution>,
    ) -> Result<Option<String>, IngestionError> {
        for round in 0..self.settings.tools.max_rounds {
            if handle.is_cancelled() {
                return Err(IngestionError::Cancelled);
            }

            let instructions = turn_instructions(
                &FactSheet::capture(session.draft(), session.constraints()),
                &session.completion(),
            );
            let window = self.context.build(session, &instructions).await?;
            let (system_prompt, messages) = to_request_messages(&window);
            let request = CompletionRequest::new(RequestPurpose::Turn, RequestMetadata::new(session.id()))
                .with_system_prompt(system_prompt)
                .with_messages(messages)
                .with_tools(catalog::all_definitions())
                .with_max_tokens(self.settings.reply_max_tokens);

            let response = match self.ai.complete(request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(round, error = %err, "model turn failed, using template reply");
                    return Ok(None);
                }
            };

            if !response.wants_tools() {
                return Ok(Some(response.content));
            }

            session.record_tool_calls(response.content.clone(), response.tool_calls.clone());
            for call in &response.tool_calls {
                let execution = self.orchestrator.execute(handle, session, call).await?;
                session.record_tool_result(call.id().clone(), execution.outcome.to_message_content());
                if !execution.applied && !execution.replayed {
                    return Err(IngestionError::Cancelled);
                }
                facts.newly_accepted.extend(execution.merged.iter().copied());
                executions.push(execution);
            }
        }
        tracing::warn!(rounds = self.settings.tools.max_rounds, "tool round budget spent");
        Ok(None)
    }

    fn try_finalize(&self, session: &mut ConversationSession, facts: &mut TurnFacts) {
        if self.settings.auto_finalize && session.try_auto_complete() {
            tracing::info!(session_id = %session.id(), "draft complete, session finalized");
        }
        facts.completed = session.status() == SessionStatus::Completed;
    }
}

/// Values the reply may mention: the draft, every user message and every
/// tool result in the history.
fn evidence_for(session: &ConversationSession) -> GroundingEvidence {
    let mut evidence = GroundingEvidence::from_draft(session.draft());
    for message in session.history() {
        if matches!(message.role(), Role::User | Role::ToolResult) {
            evidence.add_text(message.content());
        }
    }
    evidence
}
