//! Domain layer containing the ingestion business logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, confidence, errors)
//! - `project` - Target schema, draft record and the merge policy
//! - `extraction` - Document admission, flattening and field detection
//! - `conversation` - Messages, context window policy and summaries
//! - `tools` - Tool-calling vocabulary exposed to the model
//! - `response` - Next-move selection and reply grounding
//! - `session` - Conversation session aggregate and lifecycle

pub mod conversation;
pub mod extraction;
pub mod foundation;
pub mod project;
pub mod response;
pub mod session;
pub mod tools;
