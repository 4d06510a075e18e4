//! Session domain: the conversation session aggregate and its lifecycle.

mod aggregate;
mod errors;
mod status;

pub use aggregate::{ConversationSession, FinalizeOutcome, DEFAULT_MAX_HISTORY};
pub use errors::SessionError;
pub use status::SessionStatus;
