//! The closed set of operations the model may request.
//!
//! Calls are parsed and validated into a [`ToolRequest`] before anything
//! executes; a call that does not parse never reaches a collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::tool_call::ToolCall;
use super::tool_outcome::ToolError;
use crate::domain::foundation::ProjectId;
use crate::domain::project::{is_tax_id, FieldPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    LookupOwner,
    CreateProject,
    UpdateProject,
    GetProject,
    ListMissingFields,
    GenerateDescription,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::LookupOwner,
        ToolName::CreateProject,
        ToolName::UpdateProject,
        ToolName::GetProject,
        ToolName::ListMissingFields,
        ToolName::GenerateDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::LookupOwner => "lookup_owner",
            ToolName::CreateProject => "create_project",
            ToolName::UpdateProject => "update_project",
            ToolName::GetProject => "get_project",
            ToolName::ListMissingFields => "list_missing_fields",
            ToolName::GenerateDescription => "generate_description",
        }
    }

    /// Calls that change state in an external system.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, ToolName::CreateProject | ToolName::UpdateProject)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::rejected(format!("unknown tool '{}'", s)))
    }
}

/// A validated tool request.
///
/// Project payloads are never taken from the model: `create_project` sends
/// the current draft and `update_project` sends the named draft fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    LookupOwner { tax_id: String },
    CreateProject,
    UpdateProject { project_id: ProjectId, fields: Vec<FieldPath> },
    GetProject { project_id: ProjectId },
    ListMissingFields,
    GenerateDescription,
}

impl ToolRequest {
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let name: ToolName = call.name().parse()?;
        let args = call.arguments();
        match name {
            ToolName::LookupOwner => {
                let tax_id = required_str(args, "tax_id")?;
                if !is_tax_id(tax_id) {
                    return Err(ToolError::rejected(format!("'{}' is not a valid tax id", tax_id)));
                }
                Ok(ToolRequest::LookupOwner {
                    tax_id: tax_id.trim().to_string(),
                })
            }
            ToolName::CreateProject => Ok(ToolRequest::CreateProject),
            ToolName::UpdateProject => {
                let project_id = project_id(args)?;
                let fields = args
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ToolError::rejected("'fields' must be an array of field paths"))?
                    .iter()
                    .map(|raw| {
                        raw.as_str()
                            .ok_or_else(|| ToolError::rejected("field paths must be strings"))
                            .and_then(|s| s.parse::<FieldPath>().map_err(|e| ToolError::rejected(e.to_string())))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if fields.is_empty() {
                    return Err(ToolError::rejected("'fields' must not be empty"));
                }
                Ok(ToolRequest::UpdateProject { project_id, fields })
            }
            ToolName::GetProject => Ok(ToolRequest::GetProject {
                project_id: project_id(args)?,
            }),
            ToolName::ListMissingFields => Ok(ToolRequest::ListMissingFields),
            ToolName::GenerateDescription => Ok(ToolRequest::GenerateDescription),
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolRequest::LookupOwner { .. } => ToolName::LookupOwner,
            ToolRequest::CreateProject => ToolName::CreateProject,
            ToolRequest::UpdateProject { .. } => ToolName::UpdateProject,
            ToolRequest::GetProject { .. } => ToolName::GetProject,
            ToolRequest::ListMissingFields => ToolName::ListMissingFields,
            ToolRequest::GenerateDescription => ToolName::GenerateDescription,
        }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::rejected(format!("missing string argument '{}'", key)))
}

fn project_id(args: &Value) -> Result<ProjectId, ToolError> {
    ProjectId::new(required_str(args, "project_id")?).map_err(|e| ToolError::rejected(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ToolCallId;
    use crate::domain::tools::ToolErrorKind;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall::new(ToolCallId::new("call_1").unwrap(), name, args)
    }

    #[test]
    fn lookup_owner_parses_tax_id() {
        let request = ToolRequest::parse(&call("lookup_owner", json!({"tax_id": "900123456-7"}))).unwrap();
        assert_eq!(
            request,
            ToolRequest::LookupOwner {
                tax_id: "900123456-7".into()
            }
        );
    }

    #[test]
    fn lookup_owner_rejects_malformed_tax_id() {
        let err = ToolRequest::parse(&call("lookup_owner", json!({"tax_id": "abc"}))).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Rejected);
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = ToolRequest::parse(&call("delete_everything", json!({}))).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Rejected);
        assert!(err.message.contains("delete_everything"));
    }

    #[test]
    fn update_project_parses_field_paths() {
        let request = ToolRequest::parse(&call(
            "update_project",
            json!({"project_id": "p-1", "fields": ["name", "location.city"]}),
        ))
        .unwrap();
        match request {
            ToolRequest::UpdateProject { project_id, fields } => {
                assert_eq!(project_id.as_str(), "p-1");
                assert_eq!(fields, vec![FieldPath::Name, FieldPath::City]);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn update_project_rejects_unknown_field() {
        let err = ToolRequest::parse(&call(
            "update_project",
            json!({"project_id": "p-1", "fields": ["price"]}),
        ))
        .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Rejected);
    }

    #[test]
    fn get_project_requires_project_id() {
        assert!(ToolRequest::parse(&call("get_project", json!({}))).is_err());
    }

    #[test]
    fn only_store_writes_have_side_effects() {
        let writers: Vec<_> = ToolName::ALL.into_iter().filter(ToolName::has_side_effects).collect();
        assert_eq!(writers, vec![ToolName::CreateProject, ToolName::UpdateProject]);
    }
}
