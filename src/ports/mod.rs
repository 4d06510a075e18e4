//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Language model completions with tool calling
//! - `ConversationSummarizer` - Narrative summaries for context compaction
//! - `DocumentTextReader` - Format-specific text flattening
//! - `OwnerRegistry` / `ProjectStore` - External project services
//! - `ToolCallLog` - At-most-once tool call bookkeeping

mod ai_provider;
mod document_reader;
mod project_services;
mod summarizer;
mod tool_call_log;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message, MessageRole, ProviderInfo,
    RequestMetadata, RequestPurpose, TokenUsage,
};
pub use document_reader::DocumentTextReader;
pub use project_services::{OwnerRecord, OwnerRegistry, ProjectRecord, ProjectStore, ServiceError};
pub use summarizer::ConversationSummarizer;
pub use tool_call_log::{ToolCallLog, ToolCallLogError};
