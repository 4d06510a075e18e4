//! Executes model tool calls against the owner registry and project store.
//!
//! Every call is looked up in the tool-call log first, so a replayed call
//! id returns the recorded outcome instead of repeating side effects.
//! Project creation also carries `{session_id}:{call_id}` as an idempotency
//! key, so a retry after a late response cannot create a second project.
//! Upstream failures never escape as errors: they become `ToolOutcome::Error`
//! payloads that the model sees in the next round.

use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;

use super::description::DescriptionWriter;
use super::errors::IngestionError;
use super::registry::SessionHandle;
use super::settings::ToolSettings;
use crate::domain::extraction::ConfidencePolicy;
use crate::domain::foundation::{ProjectId, StateMachine, ToolCallId};
use crate::domain::project::{ExtractedFieldSet, FieldCandidate, FieldMerger, FieldPath, FieldValue, Origin};
use crate::domain::session::ConversationSession;
use crate::domain::tools::{ToolCall, ToolCallRecord, ToolError, ToolName, ToolOutcome, ToolRequest};
use crate::ports::{OwnerRecord, OwnerRegistry, ProjectRecord, ProjectStore, ServiceError, ToolCallLog};

/// Attempts per call: the first try plus one retry for transient failures.
const MAX_ATTEMPTS: u32 = 2;

/// What happened to one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    pub call_id: ToolCallId,
    pub tool_name: String,
    pub outcome: ToolOutcome,
    /// Fields accepted into the draft from the result.
    pub merged: Vec<FieldPath>,
    pub conflicts: Vec<FieldPath>,
    /// The outcome came from the log; nothing was executed.
    pub replayed: bool,
    /// False when the result was discarded because the session was cancelled.
    pub applied: bool,
}

/// Draft-side consequence of a successful call, applied after execution.
enum Effect {
    None,
    Owner(OwnerRecord),
    ProjectCreated(ProjectId),
    Description(String),
}

pub struct ToolOrchestrator {
    owners: Arc<dyn OwnerRegistry>,
    projects: Arc<dyn ProjectStore>,
    describer: Arc<DescriptionWriter>,
    log: Arc<dyn ToolCallLog>,
    merger: FieldMerger,
    confidence: ConfidencePolicy,
    settings: ToolSettings,
}

impl ToolOrchestrator {
    pub fn new(
        owners: Arc<dyn OwnerRegistry>,
        projects: Arc<dyn ProjectStore>,
        describer: Arc<DescriptionWriter>,
        log: Arc<dyn ToolCallLog>,
        merger: FieldMerger,
        confidence: ConfidencePolicy,
        settings: ToolSettings,
    ) -> Self {
        Self {
            owners,
            projects,
            describer,
            log,
            merger,
            confidence,
            settings,
        }
    }

    /// Executes `call` at most once for this session and applies its result
    /// to the draft unless the session was cancelled meanwhile.
    #[tracing::instrument(skip(self, handle, session, call), fields(session_id = %session.id(), call_id = %call.id().as_str(), tool = %call.name()))]
    pub async fn execute(
        &self,
        handle: &SessionHandle,
        session: &mut ConversationSession,
        call: &ToolCall,
    ) -> Result<ToolExecution, IngestionError> {
        if let Some(record) = self.log.find(session.id(), call.id()).await? {
            tracing::info!("tool call replayed from log");
            return Ok(ToolExecution {
                call_id: record.call_id,
                tool_name: record.tool_name,
                outcome: record.outcome,
                merged: Vec::new(),
                conflicts: Vec::new(),
                replayed: true,
                applied: false,
            });
        }

        let (outcome, effect, attempts) = match ToolRequest::parse(call) {
            Ok(request) => {
                let key = idempotency_key(session, call);
                self.run(session, &key, request).await
            }
            Err(err) => {
                tracing::debug!(error = %err, "tool call rejected before execution");
                (ToolOutcome::error(err), Effect::None, 0)
            }
        };

        let record = ToolCallRecord::new(
            session.id(),
            call.id().clone(),
            call.name(),
            call.arguments().clone(),
            outcome.clone(),
            attempts,
        );

        if handle.is_cancelled() || session.status().is_terminal() {
            tracing::info!(%outcome, "session cancelled during tool call, result discarded");
            self.log.record(record.discarded()).await?;
            return Ok(ToolExecution {
                call_id: call.id().clone(),
                tool_name: call.name().to_string(),
                outcome,
                merged: Vec::new(),
                conflicts: Vec::new(),
                replayed: false,
                applied: false,
            });
        }

        let (merged, conflicts) = self.apply(session, effect)?;
        self.log.record(record).await?;
        tracing::info!(%outcome, attempts, "tool call executed");

        Ok(ToolExecution {
            call_id: call.id().clone(),
            tool_name: call.name().to_string(),
            outcome,
            merged,
            conflicts,
            replayed: false,
            applied: true,
        })
    }

    async fn run(&self, session: &ConversationSession, key: &str, request: ToolRequest) -> (ToolOutcome, Effect, u32) {
        match request {
            ToolRequest::LookupOwner { tax_id } => {
                let owners = Arc::clone(&self.owners);
                let (result, attempts) = self
                    .with_retry(ToolName::LookupOwner, || {
                        let owners = Arc::clone(&owners);
                        let tax_id = tax_id.clone();
                        async move { owners.find_by_tax_id(&tax_id).await }
                    })
                    .await;
                match result {
                    Ok(Some(owner)) => (ToolOutcome::success(owner_json(&owner)), Effect::Owner(owner), attempts),
                    Ok(None) => (
                        ToolOutcome::error(ToolError::not_found(format!("no owner registered with tax id {}", tax_id))),
                        Effect::None,
                        attempts,
                    ),
                    Err(err) => (ToolOutcome::error(err), Effect::None, attempts),
                }
            }
            ToolRequest::CreateProject => {
                let payload = match create_payload(session) {
                    Ok(payload) => payload,
                    Err(err) => return (ToolOutcome::error(err), Effect::None, 0),
                };
                let projects = Arc::clone(&self.projects);
                let (result, attempts) = self
                    .with_retry(ToolName::CreateProject, || {
                        let projects = Arc::clone(&projects);
                        let payload = payload.clone();
                        let key = key.to_string();
                        async move { projects.create(&key, payload).await }
                    })
                    .await;
                match result {
                    Ok(id) => (
                        ToolOutcome::success(json!({ "project_id": id.as_str() })),
                        Effect::ProjectCreated(id),
                        attempts,
                    ),
                    Err(err) => (ToolOutcome::error(err), Effect::None, attempts),
                }
            }
            ToolRequest::UpdateProject { project_id, fields } => {
                let payload = session.draft().payload_for(&fields);
                if payload.is_empty() {
                    let err = ToolError::rejected("none of the requested fields have a value in the draft");
                    return (ToolOutcome::error(err), Effect::None, 0);
                }
                let projects = Arc::clone(&self.projects);
                let (result, attempts) = self
                    .with_retry(ToolName::UpdateProject, || {
                        let projects = Arc::clone(&projects);
                        let project_id = project_id.clone();
                        let payload = payload.clone();
                        async move { projects.update(&project_id, payload).await }
                    })
                    .await;
                (project_outcome(result), Effect::None, attempts)
            }
            ToolRequest::GetProject { project_id } => {
                let projects = Arc::clone(&self.projects);
                let (result, attempts) = self
                    .with_retry(ToolName::GetProject, || {
                        let projects = Arc::clone(&projects);
                        let project_id = project_id.clone();
                        async move { projects.get(&project_id).await }
                    })
                    .await;
                (project_outcome(result), Effect::None, attempts)
            }
            ToolRequest::ListMissingFields => {
                let completion = session.completion();
                let data = json!({
                    "completion_percentage": completion.percentage.value(),
                    "missing_fields": completion.missing_fields,
                    "conflicted_fields": completion.conflicted_fields,
                });
                (ToolOutcome::success(data), Effect::None, 1)
            }
            ToolRequest::GenerateDescription => {
                let drafted = self.describer.write(session.id(), session.draft()).await;
                let data = json!({ "description": drafted.text });
                (ToolOutcome::success(data), Effect::Description(drafted.text), 1)
            }
        }
    }

    /// Runs `op` under the per-attempt timeout, retrying once on transient
    /// failures. Returns the result and the number of attempts made.
    async fn with_retry<T, F, Fut>(&self, tool: ToolName, mut op: F) -> (Result<T, ToolError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = match tokio::time::timeout(self.settings.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            };
            match result {
                Ok(value) => return (Ok(value), attempts),
                Err(err) if err.is_transient() && attempts < MAX_ATTEMPTS => {
                    tracing::warn!(%tool, attempt = attempts, error = %err, "transient tool failure, retrying");
                }
                Err(err) => return (Err(to_tool_error(err)), attempts),
            }
        }
    }

    fn apply(
        &self,
        session: &mut ConversationSession,
        effect: Effect,
    ) -> Result<(Vec<FieldPath>, Vec<FieldPath>), IngestionError> {
        let fields = match effect {
            Effect::None => return Ok((Vec::new(), Vec::new())),
            Effect::ProjectCreated(id) => {
                session.record_project(id);
                return Ok((Vec::new(), Vec::new()));
            }
            Effect::Owner(owner) => self.owner_fields(&owner),
            Effect::Description(text) => {
                if session.draft().contains(FieldPath::Description) {
                    return Ok((Vec::new(), Vec::new()));
                }
                match FieldValue::parse_text(FieldPath::Description, &text) {
                    Ok(value) => ExtractedFieldSet::new().with(
                        FieldPath::Description,
                        FieldCandidate::new(value, self.confidence.generated_text(), Origin::Tool),
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, "generated description not accepted");
                        return Ok((Vec::new(), Vec::new()));
                    }
                }
            }
        };

        let outcome = session.merge(&self.merger, &fields)?;
        Ok((outcome.accepted, outcome.conflicts))
    }

    fn owner_fields(&self, owner: &OwnerRecord) -> ExtractedFieldSet {
        let mut set = ExtractedFieldSet::new();
        let candidate = |value| FieldCandidate::new(value, self.confidence.tool(), Origin::Tool);
        if let Ok(value) = FieldValue::parse_text(FieldPath::OwnerTaxId, &owner.tax_id) {
            set.insert(FieldPath::OwnerTaxId, candidate(value));
        }
        if let Ok(value) = FieldValue::parse_text(FieldPath::Builder, &owner.name) {
            set.insert(FieldPath::Builder, candidate(value));
        }
        set
    }
}

fn idempotency_key(session: &ConversationSession, call: &ToolCall) -> String {
    format!("{}:{}", session.id(), call.id().as_str())
}

fn create_payload(session: &ConversationSession) -> Result<Map<String, Value>, ToolError> {
    if let Some(existing) = session.project_id() {
        return Err(ToolError::rejected(format!(
            "project {} was already created for this session; use update_project",
            existing.as_str()
        )));
    }
    let draft = session.draft();
    let missing: Vec<&str> = [FieldPath::Name, FieldPath::OwnerTaxId]
        .into_iter()
        .filter(|path| !draft.contains(*path))
        .map(|path| path.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::rejected(format!(
            "the draft needs {} before a project can be created",
            missing.join(" and ")
        )));
    }
    Ok(draft.to_payload())
}

fn owner_json(owner: &OwnerRecord) -> Value {
    serde_json::to_value(owner).unwrap_or_else(|_| json!({ "tax_id": owner.tax_id, "name": owner.name }))
}

fn project_outcome(result: Result<ProjectRecord, ToolError>) -> ToolOutcome {
    match result {
        Ok(record) => ToolOutcome::success(json!({
            "project_id": record.id.as_str(),
            "fields": record.fields,
        })),
        Err(err) => ToolOutcome::error(err),
    }
}

fn to_tool_error(err: ServiceError) -> ToolError {
    match err {
        ServiceError::Timeout => ToolError::unavailable("the service did not answer in time"),
        ServiceError::Unavailable(message) => ToolError::unavailable(message),
        ServiceError::NotFound(message) => ToolError::not_found(message),
        ServiceError::Rejected(message) => ToolError::rejected(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::services::{InMemoryOwnerRegistry, InMemoryProjectStore};
    use crate::adapters::storage::InMemoryToolCallLog;
    use crate::domain::foundation::Confidence;
    use crate::domain::project::MergeConfig;
    use crate::domain::tools::ToolErrorKind;
    use crate::ports::RequestPurpose;
    use std::time::Duration;

    struct Fixture {
        owners: InMemoryOwnerRegistry,
        projects: InMemoryProjectStore,
        log: InMemoryToolCallLog,
        orchestrator: ToolOrchestrator,
        handle: Arc<SessionHandle>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_ai(MockAIProvider::new())
        }

        fn with_ai(ai: MockAIProvider) -> Self {
            let owners = InMemoryOwnerRegistry::new();
            let projects = InMemoryProjectStore::new();
            let log = InMemoryToolCallLog::new();
            let settings = ToolSettings {
                timeout: Duration::from_millis(50),
                max_rounds: 4,
            };
            let orchestrator = ToolOrchestrator::new(
                Arc::new(owners.clone()),
                Arc::new(projects.clone()),
                Arc::new(DescriptionWriter::new(Arc::new(ai))),
                Arc::new(log.clone()),
                FieldMerger::new(MergeConfig::default()),
                ConfidencePolicy::default(),
                settings,
            );
            let handle = Arc::new(SessionHandle::new(ConversationSession::new(None, 50)));
            Self {
                owners,
                projects,
                log,
                orchestrator,
                handle,
            }
        }

        async fn run(&self, call: &ToolCall) -> ToolExecution {
            let mut session = self.handle.lock().await;
            session.accept_input().unwrap();
            self.orchestrator.execute(&self.handle, &mut session, call).await.unwrap()
        }

        async fn seed(&self, path: FieldPath, value: FieldValue) {
            let mut session = self.handle.lock().await;
            let fields = ExtractedFieldSet::new()
                .with(path, FieldCandidate::new(value, Confidence::new(1.0), Origin::Conversation));
            session.merge(&FieldMerger::default(), &fields).unwrap();
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCall {
        ToolCall::new(ToolCallId::new(id).unwrap(), name, args)
    }

    mod lookup_owner {
        use super::*;

        #[tokio::test]
        async fn found_owner_is_merged_with_tool_origin() {
            let fx = Fixture::new();
            fx.owners
                .insert(OwnerRecord {
                    tax_id: "900123456-7".to_string(),
                    name: "Constructora Andina".to_string(),
                    email: None,
                })
                .await;

            let exec = fx.run(&call("c1", "lookup_owner", json!({ "tax_id": "900123456-7" }))).await;

            assert!(exec.outcome.is_success());
            assert!(exec.merged.contains(&FieldPath::OwnerTaxId));
            assert!(exec.merged.contains(&FieldPath::Builder));
            let session = fx.handle.lock().await;
            assert_eq!(session.draft().get(FieldPath::Builder).unwrap().origin, Origin::Tool);
        }

        #[tokio::test]
        async fn unknown_owner_is_not_found_and_not_retried() {
            let fx = Fixture::new();

            let exec = fx.run(&call("c1", "lookup_owner", json!({ "tax_id": "900123456" }))).await;

            assert_eq!(exec.outcome.error_ref().unwrap().kind, ToolErrorKind::NotFound);
            assert_eq!(fx.owners.call_count(), 1);
        }

        #[tokio::test]
        async fn invalid_arguments_are_rejected_without_a_call() {
            let fx = Fixture::new();

            let exec = fx.run(&call("c1", "lookup_owner", json!({ "tax_id": "abc" }))).await;

            assert_eq!(exec.outcome.error_ref().unwrap().kind, ToolErrorKind::Rejected);
            assert_eq!(fx.owners.call_count(), 0);
            assert_eq!(fx.log.record_count().await, 1);
        }
    }

    mod create_project {
        use super::*;

        async fn ready_fixture() -> Fixture {
            let fx = Fixture::new();
            fx.seed(FieldPath::Name, FieldValue::Text("Torre Alameda".into())).await;
            fx.seed(FieldPath::OwnerTaxId, FieldValue::Text("900123456".into())).await;
            fx
        }

        #[tokio::test]
        async fn replayed_call_id_creates_once() {
            let fx = ready_fixture().await;
            let create = call("c1", "create_project", json!({}));

            let first = fx.run(&create).await;
            let second = fx.run(&create).await;

            assert!(first.outcome.is_success());
            assert!(second.replayed);
            assert_eq!(first.outcome, second.outcome);
            assert_eq!(fx.projects.create_count(), 1);
        }

        #[tokio::test]
        async fn timeout_then_success_yields_one_project() {
            let fx = ready_fixture().await;
            fx.projects.set_delay(Duration::from_millis(200)).await;

            let store = fx.projects.clone();
            let create = call("c1", "create_project", json!({}));
            let (exec, _) = tokio::join!(fx.run(&create), async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                store.set_delay(Duration::ZERO).await;
            });

            assert!(exec.outcome.is_success());
            assert_eq!(fx.projects.create_count(), 1);
            assert_eq!(fx.projects.call_count(), 2);
            let session = fx.handle.lock().await;
            assert_eq!(session.project_id().unwrap().as_str(), "P-1");
        }

        #[tokio::test]
        async fn late_reply_after_commit_is_not_created_twice() {
            let fx = ready_fixture().await;
            fx.projects.reply_late_once(Duration::from_millis(200)).await;

            let exec = fx.run(&call("c1", "create_project", json!({}))).await;

            assert!(exec.outcome.is_success());
            assert_eq!(exec.outcome.data().unwrap()["project_id"], json!("P-1"));
            assert_eq!(fx.projects.call_count(), 2);
            assert_eq!(fx.projects.create_count(), 1);
            assert_eq!(fx.projects.project_count().await, 1);
        }

        #[tokio::test]
        async fn second_create_with_new_id_is_rejected() {
            let fx = ready_fixture().await;
            fx.run(&call("c1", "create_project", json!({}))).await;

            let again = fx.run(&call("c2", "create_project", json!({}))).await;

            assert_eq!(again.outcome.error_ref().unwrap().kind, ToolErrorKind::Rejected);
            assert_eq!(fx.projects.create_count(), 1);
        }

        #[tokio::test]
        async fn draft_without_name_is_rejected() {
            let fx = Fixture::new();

            let exec = fx.run(&call("c1", "create_project", json!({}))).await;

            assert_eq!(exec.outcome.error_ref().unwrap().kind, ToolErrorKind::Rejected);
            assert_eq!(fx.projects.call_count(), 0);
        }

        #[tokio::test]
        async fn persistent_unavailability_is_retried_once() {
            let fx = ready_fixture().await;
            fx.projects.fail_next(ServiceError::unavailable("503")).await;
            fx.projects.fail_next(ServiceError::unavailable("503")).await;

            let exec = fx.run(&call("c1", "create_project", json!({}))).await;

            assert_eq!(exec.outcome.error_ref().unwrap().kind, ToolErrorKind::Unavailable);
            assert_eq!(fx.projects.call_count(), 2);
        }

        #[tokio::test]
        async fn cancelled_session_discards_the_result() {
            let fx = ready_fixture().await;
            fx.handle.mark_cancelled();

            let exec = fx.run(&call("c1", "create_project", json!({}))).await;

            assert!(!exec.applied);
            assert_eq!(fx.projects.create_count(), 1);
            let records = fx.log.for_session(fx.handle.id()).await.unwrap();
            assert!(!records[0].applied);
            assert!(fx.handle.lock().await.project_id().is_none());
        }
    }

    mod other_tools {
        use super::*;

        #[tokio::test]
        async fn list_missing_fields_reports_required_paths() {
            let fx = Fixture::new();

            let exec = fx.run(&call("c1", "list_missing_fields", json!({}))).await;

            let data = exec.outcome.data().unwrap();
            assert_eq!(data["completion_percentage"], 0);
            assert_eq!(data["missing_fields"][0], "name");
        }

        #[tokio::test]
        async fn update_sends_only_named_draft_fields() {
            let fx = Fixture::new();
            fx.seed(FieldPath::Name, FieldValue::Text("Torre Alameda".into())).await;
            fx.seed(FieldPath::OwnerTaxId, FieldValue::Text("900123456".into())).await;
            fx.seed(FieldPath::City, FieldValue::Text("Bogotá".into())).await;
            fx.run(&call("c1", "create_project", json!({}))).await;
            let id = ProjectId::new("P-1").unwrap();

            let exec = fx
                .run(&call("c2", "update_project", json!({ "project_id": "P-1", "fields": ["location.city"] })))
                .await;

            assert!(exec.outcome.is_success());
            let stored = fx.projects.stored(&id).await.unwrap();
            assert!(stored.contains_key("location.city"));
        }

        #[tokio::test]
        async fn generated_description_fills_an_empty_field_only() {
            let ai = MockAIProvider::new().with_purpose_response(
                RequestPurpose::Description,
                "A calm residential project close to parks and schools.",
            );
            let fx = Fixture::with_ai(ai);

            let first = fx.run(&call("c1", "generate_description", json!({}))).await;
            assert_eq!(first.merged, vec![FieldPath::Description]);

            let second = fx.run(&call("c2", "generate_description", json!({}))).await;
            assert!(second.outcome.is_success());
            assert!(second.merged.is_empty());
        }

        #[tokio::test]
        async fn unknown_tool_is_rejected() {
            let fx = Fixture::new();

            let exec = fx.run(&call("c1", "delete_everything", json!({}))).await;

            assert_eq!(exec.outcome.error_ref().unwrap().kind, ToolErrorKind::Rejected);
        }
    }
}
