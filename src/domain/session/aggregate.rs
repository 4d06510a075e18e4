//! Conversation session aggregate.
//!
//! A session owns exactly one [`ProjectDraft`], the message log, the
//! rolling context summary and the ledger of user constraints. The draft
//! only changes through [`FieldMerger`], and only while the session is not
//! terminal.
//!
//! # Invariants
//!
//! - Message sequence numbers are strictly increasing and never reused
//! - The in-memory log holds at most `max_history` messages; anything older
//!   is represented by the summary
//! - `completion()` is always computed from the current draft
//! - Completed and cancelled sessions never change again

use serde::Serialize;

use super::errors::SessionError;
use super::status::SessionStatus;
use crate::domain::conversation::{ConstraintLedger, ContextSummary, ConversationMessage, Role};
use crate::domain::foundation::{ProjectId, SessionId, StateMachine, Timestamp, ToolCallId};
use crate::domain::project::{
    CompletionReport, ConflictResolution, ExtractedFieldSet, FieldMerger, FieldPath, MergeOutcome, ProjectDraft,
};
use crate::domain::tools::ToolCall;

/// Default cap on retained messages.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Result of a finalize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeOutcome {
    Completed,
    /// The session was already completed; nothing changed.
    AlreadyCompleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSession {
    id: SessionId,
    status: SessionStatus,
    owner_tax_id: Option<String>,
    project_id: Option<ProjectId>,
    draft: ProjectDraft,
    history: Vec<ConversationMessage>,
    max_history: usize,
    summary: Option<ContextSummary>,
    constraints: ConstraintLedger,
    next_seq: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ConversationSession {
    /// Creates a session in `created`. The owner reference, if any, is kept
    /// as given; merging it into the draft is the caller's decision.
    pub fn new(owner_tax_id: Option<String>, max_history: usize) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            status: SessionStatus::Created,
            owner_tax_id: owner_tax_id.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            project_id: None,
            draft: ProjectDraft::new(),
            history: Vec::new(),
            max_history: max_history.max(1),
            summary: None,
            constraints: ConstraintLedger::new(),
            next_seq: 1,
            created_at: now,
            updated_at: now,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn owner_tax_id(&self) -> Option<&str> {
        self.owner_tax_id.as_deref()
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }

    pub fn draft(&self) -> &ProjectDraft {
        &self.draft
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn summary(&self) -> Option<&ContextSummary> {
        self.summary.as_ref()
    }

    pub fn constraints(&self) -> &ConstraintLedger {
        &self.constraints
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn completion(&self) -> CompletionReport {
        CompletionReport::of(&self.draft)
    }

    /// Messages not yet folded into the summary.
    pub fn unsummarized(&self) -> &[ConversationMessage] {
        let covered = self.summary.as_ref().map_or(0, ContextSummary::covers_through);
        let start = self.history.partition_point(|m| m.seq() <= covered);
        &self.history[start..]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Called before processing a message or document. The first input
    /// activates a `created` session.
    pub fn accept_input(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Created => self.move_to(SessionStatus::Active),
            other => Err(SessionError::NotAcceptingInput(other)),
        }
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.move_to(SessionStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Paused {
            return Err(SessionError::invalid_transition(
                self.status,
                SessionStatus::Active,
                "only a paused session can be resumed",
            ));
        }
        self.move_to(SessionStatus::Active)
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.move_to(SessionStatus::Cancelled)
    }

    /// Completes the session if the draft is fully complete with no open
    /// conflicts. Repeating the request on a completed session is a no-op.
    pub fn finalize(&mut self) -> Result<FinalizeOutcome, SessionError> {
        if self.status == SessionStatus::Completed {
            return Ok(FinalizeOutcome::AlreadyCompleted);
        }
        if !self.status.can_transition_to(&SessionStatus::Completed) {
            return Err(SessionError::invalid_transition(
                self.status,
                SessionStatus::Completed,
                "only an active session can be finalized",
            ));
        }
        let report = self.completion();
        if !report.is_ready_to_finalize() {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Completed,
                reason: format!(
                    "draft is {} complete with {} open conflict(s)",
                    report.percentage,
                    report.conflicted_fields.len()
                ),
                missing: report.missing_fields,
                conflicted: report.conflicted_fields,
            });
        }
        self.move_to(SessionStatus::Completed)?;
        Ok(FinalizeOutcome::Completed)
    }

    /// Completes an active session whose draft just became complete.
    /// Returns whether the transition happened.
    pub fn try_auto_complete(&mut self) -> bool {
        self.status == SessionStatus::Active
            && self.completion().is_ready_to_finalize()
            && self.move_to(SessionStatus::Completed).is_ok()
    }

    /// True for terminal sessions last touched before `cutoff`.
    pub fn is_expired(&self, cutoff: &Timestamp) -> bool {
        self.status.is_terminal() && self.updated_at.is_before(cutoff)
    }

    fn move_to(&mut self, target: SessionStatus) -> Result<(), SessionError> {
        let next = self.status.transition_to(target).map_err(|err| {
            SessionError::invalid_transition(err.from, err.to, "transition not allowed")
        })?;
        tracing::debug!(session_id = %self.id, from = %self.status, to = %next, "session transition");
        self.status = next;
        self.touch();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Draft
    // ─────────────────────────────────────────────────────────────────────

    /// Merges candidates into the draft. The draft is replaced wholesale
    /// so a failed merge leaves it untouched.
    pub fn merge(&mut self, merger: &FieldMerger, fields: &ExtractedFieldSet) -> Result<MergeOutcome, SessionError> {
        self.ensure_draft_mutable()?;
        let (draft, outcome) = merger.merge(&self.draft, fields);
        if outcome.changed_draft() {
            self.draft = draft;
            self.touch();
        }
        Ok(outcome)
    }

    pub fn resolve_conflict(
        &mut self,
        merger: &FieldMerger,
        path: FieldPath,
        resolution: ConflictResolution,
    ) -> Result<(), SessionError> {
        self.ensure_draft_mutable()?;
        self.draft = merger.resolve_conflict(&self.draft, path, resolution)?;
        self.touch();
        Ok(())
    }

    pub fn record_project(&mut self, project_id: ProjectId) {
        self.project_id = Some(project_id);
        self.touch();
    }

    fn ensure_draft_mutable(&self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            Err(SessionError::DraftLocked(self.status))
        } else {
            Ok(())
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────

    /// Appends a user message and records any constraints it states.
    pub fn record_user_message(&mut self, content: impl Into<String>) -> &ConversationMessage {
        let seq = self.take_seq();
        let message = ConversationMessage::user(seq, content);
        self.constraints.observe(seq, message.content());
        self.push(message)
    }

    pub fn record_assistant_message(&mut self, content: impl Into<String>) -> &ConversationMessage {
        let seq = self.take_seq();
        self.push(ConversationMessage::assistant(seq, content))
    }

    pub fn record_system_note(&mut self, content: impl Into<String>) -> &ConversationMessage {
        let seq = self.take_seq();
        self.push(ConversationMessage::system(seq, content))
    }

    pub fn record_tool_calls(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) -> &ConversationMessage {
        let seq = self.take_seq();
        self.push(ConversationMessage::assistant_tool_calls(seq, content, calls))
    }

    pub fn record_tool_result(&mut self, call_id: ToolCallId, content: impl Into<String>) -> &ConversationMessage {
        let seq = self.take_seq();
        self.push(ConversationMessage::tool_result(seq, call_id, content))
    }

    /// Replaces the summary. A summary never moves backwards.
    pub fn set_summary(&mut self, summary: ContextSummary) {
        let current = self.summary.as_ref().map_or(0, ContextSummary::covers_through);
        if summary.covers_through() >= current {
            self.summary = Some(summary);
            self.touch();
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn push(&mut self, message: ConversationMessage) -> &ConversationMessage {
        self.history.push(message);
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
            // A tool result without its request would confuse the model.
            let orphans = self
                .history
                .iter()
                .take_while(|m| m.role() == Role::ToolResult)
                .count();
            self.history.drain(..orphans);
        }
        self.touch();
        &self.history[self.history.len() - 1]
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
