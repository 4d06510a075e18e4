//! Foundation module - Shared domain primitives.
//!
//! Identifiers, value objects and error types used across the
//! ingestion domain.

mod confidence;
mod errors;
mod ids;
mod percentage;
mod state_machine;
mod timestamp;

pub use confidence::Confidence;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{MessageId, ProjectId, SessionId, ToolCallId, UploadId};
pub use percentage::Percentage;
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
