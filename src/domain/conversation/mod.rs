//! Conversation domain: messages, the context window policy, and the
//! fact sheet that keeps summaries lossless.

mod constraints;
mod context;
mod message;
mod summary;

pub use constraints::{detect_constraints, ConstraintLedger, UserConstraint};
pub use context::{
    CompactionPlan, ContextConfig, ContextOverflowError, ContextWindow, ContextWindowManager, TokenBudget,
};
pub use message::{estimate_tokens, ConversationMessage, Role};
pub use summary::{ContextSummary, FactSheet};
