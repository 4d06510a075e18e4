//! Tool schemas advertised to the model.

use serde_json::json;

use super::tool_definition::ToolDefinition;
use super::tool_request::ToolName;
use crate::domain::project::FieldPath;

pub fn definition(name: ToolName) -> ToolDefinition {
    match name {
        ToolName::LookupOwner => ToolDefinition::new(
            name.as_str(),
            "Look up the registered project owner by tax id (NIT). Returns the owner record or a not_found error.",
            json!({
                "type": "object",
                "required": ["tax_id"],
                "properties": {
                    "tax_id": {"type": "string", "description": "Owner NIT, digits with optional check digit"}
                }
            }),
        ),
        ToolName::CreateProject => ToolDefinition::without_parameters(
            name.as_str(),
            "Create the project in the project store from the current draft. Returns the new project id.",
        ),
        ToolName::UpdateProject => ToolDefinition::new(
            name.as_str(),
            "Push the named draft fields to an existing project. Values are taken from the draft.",
            json!({
                "type": "object",
                "required": ["project_id", "fields"],
                "properties": {
                    "project_id": {"type": "string"},
                    "fields": {
                        "type": "array",
                        "items": {"type": "string", "enum": field_names()}
                    }
                }
            }),
        ),
        ToolName::GetProject => ToolDefinition::new(
            name.as_str(),
            "Fetch a project from the project store.",
            json!({
                "type": "object",
                "required": ["project_id"],
                "properties": {"project_id": {"type": "string"}}
            }),
        ),
        ToolName::ListMissingFields => ToolDefinition::without_parameters(
            name.as_str(),
            "List required fields that are still missing or under conflict, plus the completion percentage.",
        ),
        ToolName::GenerateDescription => ToolDefinition::without_parameters(
            name.as_str(),
            "Write a marketing description using only facts already in the draft.",
        ),
    }
}

/// Every tool, in a stable order.
pub fn all_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(definition).collect()
}

fn field_names() -> Vec<&'static str> {
    FieldPath::ALL.iter().map(FieldPath::as_str).collect()
}
