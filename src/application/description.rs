//! Project description drafting.

use std::fmt::Write;
use std::sync::Arc;

use crate::domain::foundation::SessionId;
use crate::domain::project::{FieldPath, FieldValue, ProjectDraft};
use crate::domain::response::{GroundingEvidence, DESCRIPTION_INSTRUCTIONS};
use crate::ports::{AIProvider, CompletionRequest, Message, RequestMetadata, RequestPurpose};

const MIN_DESCRIPTION_CHARS: usize = 20;

/// Where a drafted description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSource {
    Model,
    Template,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftedDescription {
    pub text: String,
    pub source: DescriptionSource,
}

/// Asks the model for a description built from the draft's facts, and
/// falls back to a fixed template when the reply is unusable.
pub struct DescriptionWriter {
    ai: Arc<dyn AIProvider>,
    max_tokens: u32,
}

impl DescriptionWriter {
    pub fn new(ai: Arc<dyn AIProvider>) -> Self {
        Self { ai, max_tokens: 400 }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn write(&self, session_id: SessionId, draft: &ProjectDraft) -> DraftedDescription {
        let request = CompletionRequest::new(RequestPurpose::Description, RequestMetadata::new(session_id))
            .with_system_prompt(DESCRIPTION_INSTRUCTIONS)
            .with_message(Message::user(fact_list(draft)))
            .with_max_tokens(self.max_tokens);

        match self.ai.complete(request).await {
            Ok(response) => {
                let text = response.content.trim();
                let evidence = GroundingEvidence::from_draft(draft);
                if text.chars().count() >= MIN_DESCRIPTION_CHARS && evidence.is_grounded(text) {
                    return DraftedDescription {
                        text: text.to_string(),
                        source: DescriptionSource::Model,
                    };
                }
                tracing::warn!(%session_id, "model description rejected, using template");
            }
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "description request failed, using template");
            }
        }

        DraftedDescription {
            text: template_description(draft),
            source: DescriptionSource::Template,
        }
    }
}

fn fact_list(draft: &ProjectDraft) -> String {
    let mut out = String::from("Project facts:\n");
    for (path, field) in draft.fields() {
        if path == FieldPath::Description {
            continue;
        }
        let _ = writeln!(out, "- {}: {}", path.label(), field.value);
    }
    out
}

fn text_of(draft: &ProjectDraft, path: FieldPath) -> Option<String> {
    draft.value(path).map(FieldValue::to_string)
}

/// Deterministic description using only values present in the draft.
pub fn template_description(draft: &ProjectDraft) -> String {
    let name = text_of(draft, FieldPath::Name).unwrap_or_else(|| "This project".to_string());
    let mut text = format!("{} is a residential real-estate project", name);

    match (text_of(draft, FieldPath::Neighborhood), text_of(draft, FieldPath::City)) {
        (Some(neighborhood), Some(city)) => {
            let _ = write!(text, " located in {}, {}", neighborhood, city);
        }
        (None, Some(city)) => {
            let _ = write!(text, " located in {}", city);
        }
        _ => {}
    }
    if let Some(builder) = text_of(draft, FieldPath::Builder) {
        let _ = write!(text, ", developed by {}", builder);
    }
    text.push('.');

    if let Some(units) = text_of(draft, FieldPath::UnitTypes) {
        let _ = write!(text, " It offers {}.", units);
    }
    if let Some(amenities) = text_of(draft, FieldPath::Amenities) {
        let _ = write!(text, " Amenities include {}.", amenities);
    }
    text
}
