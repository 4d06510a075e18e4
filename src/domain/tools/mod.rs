//! Tool-calling vocabulary shared by the model adapters and the orchestrator.

pub mod catalog;
mod tool_call;
mod tool_definition;
mod tool_outcome;
mod tool_record;
mod tool_request;

pub use tool_call::ToolCall;
pub use tool_definition::ToolDefinition;
pub use tool_outcome::{ToolError, ToolErrorKind, ToolOutcome};
pub use tool_record::ToolCallRecord;
pub use tool_request::{ToolName, ToolRequest};
