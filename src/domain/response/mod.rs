//! Reply planning, grounding and prompt text.

mod generator;
mod grounding;
mod templates;

pub use generator::{ResponseGenerator, ResponseMove, ResponsePlan, TurnFacts};
pub use grounding::GroundingEvidence;
pub use templates::{turn_instructions, DESCRIPTION_INSTRUCTIONS, OPENING_MESSAGE, SUMMARY_INSTRUCTIONS};
