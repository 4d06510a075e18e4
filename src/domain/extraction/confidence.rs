//! Confidence levels assigned by source. These are calibration knobs,
//! loaded from configuration.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    /// Labelled regex match in the source text.
    pub pattern_match: f32,
    /// Model value that appears verbatim in the source text.
    pub grounded_inference: f32,
    /// Model value with no textual evidence, or an unlabelled keyword hit.
    pub free_inference: f32,
    pub user_statement: f32,
    pub tool_result: f32,
    /// Text the model wrote from draft facts, e.g. a description.
    pub generated: f32,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            pattern_match: 0.9,
            grounded_inference: 0.7,
            free_inference: 0.5,
            user_statement: 1.0,
            tool_result: 0.95,
            generated: 0.6,
        }
    }
}

impl ConfidencePolicy {
    pub fn pattern(&self) -> Confidence {
        Confidence::new(self.pattern_match)
    }

    pub fn grounded(&self) -> Confidence {
        Confidence::new(self.grounded_inference)
    }

    pub fn inferred(&self) -> Confidence {
        Confidence::new(self.free_inference)
    }

    pub fn user(&self) -> Confidence {
        Confidence::new(self.user_statement)
    }

    pub fn tool(&self) -> Confidence {
        Confidence::new(self.tool_result)
    }

    pub fn generated_text(&self) -> Confidence {
        Confidence::new(self.generated)
    }

    pub fn is_ordered(&self) -> bool {
        self.pattern_match >= self.grounded_inference && self.grounded_inference >= self.free_inference
    }
}
