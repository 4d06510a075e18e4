//! Merge threshold and per-source confidences

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::extraction::ConfidencePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct MergeSettingsConfig {
    /// Relative numeric difference above which two values conflict
    #[serde(default = "default_materiality")]
    pub materiality_threshold: f64,

    #[serde(default)]
    pub confidence: ConfidencePolicy,
}

impl MergeSettingsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.materiality_threshold > 0.0 && self.materiality_threshold < 1.0) {
            return Err(ValidationError::OutOfRange("merge.materiality_threshold"));
        }
        if !self.confidence.is_ordered() {
            return Err(ValidationError::OutOfRange("merge.confidence"));
        }
        Ok(())
    }
}

impl Default for MergeSettingsConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: default_materiality(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

fn default_materiality() -> f64 {
    0.20
}
