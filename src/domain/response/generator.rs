//! Chooses the assistant's next conversational move and renders it.
//!
//! Every value a rendered reply mentions is read from the draft. Model
//! replies are only passed through when [`GroundingEvidence`] supports them.

use serde::Serialize;

use super::grounding::GroundingEvidence;
use crate::domain::foundation::ProjectId;
use crate::domain::project::{CompletionReport, FieldPath, Origin, ProjectDraft};

/// One step of the assistant's reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "move", content = "detail", rename_all = "snake_case")]
pub enum ResponseMove {
    /// A tool or extraction failure, already in plain language.
    ReportError(String),
    /// Fields accepted during this turn.
    Acknowledge(Vec<FieldPath>),
    ResolveConflict(FieldPath),
    Ask(FieldPath),
    ProposeFinalize,
    Completed,
}

/// What happened during a turn, as far as the reply is concerned.
#[derive(Debug, Clone, Default)]
pub struct TurnFacts {
    pub newly_accepted: Vec<FieldPath>,
    pub errors: Vec<String>,
    pub completed: bool,
    pub project_id: Option<ProjectId>,
}

/// Ordered moves for one reply: errors first, then the acknowledgement,
/// then exactly one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsePlan {
    moves: Vec<ResponseMove>,
}

impl ResponsePlan {
    pub fn moves(&self) -> &[ResponseMove] {
        &self.moves
    }

    /// The highest-priority move.
    pub fn primary(&self) -> &ResponseMove {
        self.moves
            .iter()
            .find(|m| matches!(m, ResponseMove::ReportError(_)))
            .or_else(|| self.moves.last())
            .unwrap_or(&ResponseMove::ProposeFinalize)
    }

    /// The decision that closes the reply.
    pub fn decision(&self) -> Option<&ResponseMove> {
        self.moves.last()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseGenerator;

impl ResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, draft: &ProjectDraft, completion: &CompletionReport, facts: &TurnFacts) -> ResponsePlan {
        let mut moves: Vec<ResponseMove> =
            facts.errors.iter().cloned().map(ResponseMove::ReportError).collect();

        let acknowledged: Vec<FieldPath> = facts
            .newly_accepted
            .iter()
            .copied()
            .filter(|path| draft.contains(*path))
            .collect();
        if !acknowledged.is_empty() {
            moves.push(ResponseMove::Acknowledge(acknowledged));
        }

        let decision = if facts.completed {
            ResponseMove::Completed
        } else if let Some(path) = completion.conflicted_fields.first() {
            ResponseMove::ResolveConflict(*path)
        } else if let Some(path) = completion.missing_fields.first() {
            ResponseMove::Ask(*path)
        } else {
            ResponseMove::ProposeFinalize
        };
        moves.push(decision);
        ResponsePlan { moves }
    }

    /// Deterministic reply text built from the plan and the draft.
    pub fn render(&self, plan: &ResponsePlan, draft: &ProjectDraft, facts: &TurnFacts) -> String {
        let mut parts: Vec<String> = Vec::new();
        for step in plan.moves() {
            match step {
                ResponseMove::ReportError(message) => parts.push(message.clone()),
                ResponseMove::Acknowledge(paths) => {
                    let noted: Vec<String> = paths
                        .iter()
                        .filter_map(|path| draft.value(*path).map(|value| format!("{}: {}", path.label(), value)))
                        .collect();
                    if !noted.is_empty() {
                        parts.push(format!("Got it. {}.", noted.join("; ")));
                    }
                }
                ResponseMove::ResolveConflict(path) => parts.push(conflict_question(draft, *path)),
                ResponseMove::Ask(path) => parts.push(question_for(*path)),
                ResponseMove::ProposeFinalize => parts.push(
                    "All the required information is complete. Shall I finalize the project?".to_string(),
                ),
                ResponseMove::Completed => parts.push(match &facts.project_id {
                    Some(id) => format!("The project is complete and registered as {}.", id),
                    None => "The project is complete.".to_string(),
                }),
            }
        }
        parts.join("\n\n")
    }

    /// Uses the model's reply when it is non-empty and grounded, otherwise
    /// the rendered template.
    pub fn choose_reply(
        &self,
        model_reply: Option<&str>,
        evidence: &GroundingEvidence,
        plan: &ResponsePlan,
        draft: &ProjectDraft,
        facts: &TurnFacts,
    ) -> String {
        if let Some(reply) = model_reply.map(str::trim).filter(|reply| !reply.is_empty()) {
            let numbers = evidence.unsupported_numbers(reply);
            let names = evidence.unsupported_names(reply);
            if numbers.is_empty() && names.is_empty() {
                // Errors are always surfaced even if the model glossed over them.
                let errors = self.render_errors(plan);
                return if errors.is_empty() {
                    reply.to_string()
                } else {
                    format!("{}\n\n{}", errors, reply)
                };
            }
            tracing::warn!(?numbers, ?names, "model reply mentions unsupported values, using template");
        }
        self.render(plan, draft, facts)
    }

    fn render_errors(&self, plan: &ResponsePlan) -> String {
        plan.moves()
            .iter()
            .filter_map(|m| match m {
                ResponseMove::ReportError(message) => Some(message.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn origin_label(origin: Origin) -> &'static str {
    match origin {
        Origin::Document => "from the document",
        Origin::Conversation => "from our chat",
        Origin::Tool => "from the registry",
    }
}

fn conflict_question(draft: &ProjectDraft, path: FieldPath) -> String {
    match draft.conflict(path) {
        Some(conflict) => format!(
            "I have two different values for the {}: {} ({}) and {} ({}). Which one is correct?",
            path.label(),
            conflict.current.value,
            origin_label(conflict.current.origin),
            conflict.proposed.value,
            origin_label(conflict.proposed.origin),
        ),
        None => format!("Could you confirm the {}?", path.label()),
    }
}

fn question_for(path: FieldPath) -> String {
    match path {
        FieldPath::Name => "What's the name of the project?".to_string(),
        FieldPath::Description => "Could you describe the project in a couple of sentences? I can also draft a description for you.".to_string(),
        FieldPath::OwnerTaxId => "What is the owner's tax id (NIT)?".to_string(),
        FieldPath::DeliveryDate => "When is delivery expected (month and year)?".to_string(),
        FieldPath::City => "Which city is the project in?".to_string(),
        FieldPath::PriceMin => "What is the starting price?".to_string(),
        FieldPath::UnitTypes => "What types of units does the project offer (apartments, houses, offices...)?".to_string(),
        FieldPath::Amenities => "Which amenities does the project have?".to_string(),
        FieldPath::OffersFinancing => "Does the project offer financing?".to_string(),
        other => format!("What is the {}?", other.label()),
    }
}
