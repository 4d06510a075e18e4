//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers take a command or query, lock the session they address through
//! the [`SessionRegistry`], and return a result for the HTTP layer to map.

mod context_builder;
mod description;
mod document_processor;
mod errors;
mod field_extractor;
pub mod handlers;
mod progress;
mod registry;
mod settings;
mod tool_orchestrator;

pub use context_builder::{to_request_messages, ContextBuilder};
pub use description::{template_description, DescriptionSource, DescriptionWriter, DraftedDescription};
pub use document_processor::{DocumentProcessor, UploadReport};
pub use errors::IngestionError;
pub use field_extractor::FieldExtractor;
pub use handlers::*;
pub use progress::{merge_facts, CompletionView};
pub use registry::{SessionHandle, SessionRegistry};
pub use settings::{IngestionSettings, ToolSettings};
pub use tool_orchestrator::{ToolExecution, ToolOrchestrator};
