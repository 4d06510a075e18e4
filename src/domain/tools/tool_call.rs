//! A tool call as requested by the language model.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ToolCallId;

/// The model's intent to call a tool.
///
/// Arguments stay as raw JSON here; [`ToolRequest::parse`](super::ToolRequest::parse)
/// turns them into a typed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    id: ToolCallId,
    name: String,
    arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: ToolCallId, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id,
            name: name.into(),
            arguments,
        }
    }

    pub fn id(&self) -> &ToolCallId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &serde_json::Value {
        &self.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_return_constructor_values() {
        let id = ToolCallId::new("call_1").unwrap();
        let call = ToolCall::new(id.clone(), "get_project", json!({"project_id": "p-1"}));
        assert_eq!(call.id(), &id);
        assert_eq!(call.name(), "get_project");
        assert_eq!(call.arguments()["project_id"], "p-1");
    }
}
