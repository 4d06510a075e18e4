//! Context window budget

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ContextWindowConfig {
    /// Token limit of the model
    #[serde(default = "default_max_context")]
    pub max_context_tokens: u32,

    /// Tokens held back for the reply
    #[serde(default = "default_reserved")]
    pub reserved_for_response: u32,

    /// Fraction of the budget that triggers summarization
    #[serde(default = "default_high_water")]
    pub high_water_ratio: f32,

    /// Recent messages always kept verbatim
    #[serde(default = "default_retained")]
    pub retained_messages: usize,
}

impl ContextWindowConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reserved_for_response >= self.max_context_tokens {
            return Err(ValidationError::OutOfRange("context.reserved_for_response"));
        }
        if !(self.high_water_ratio > 0.0 && self.high_water_ratio <= 1.0) {
            return Err(ValidationError::OutOfRange("context.high_water_ratio"));
        }
        if self.retained_messages == 0 {
            return Err(ValidationError::OutOfRange("context.retained_messages"));
        }
        Ok(())
    }
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context(),
            reserved_for_response: default_reserved(),
            high_water_ratio: default_high_water(),
            retained_messages: default_retained(),
        }
    }
}

fn default_max_context() -> u32 {
    8_000
}

fn default_reserved() -> u32 {
    1_000
}

fn default_high_water() -> f32 {
    0.9
}

fn default_retained() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_must_fit_in_budget() {
        let config = ContextWindowConfig {
            max_context_tokens: 1_000,
            reserved_for_response: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn ratio_above_one_is_rejected() {
        let config = ContextWindowConfig {
            high_water_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ContextWindowConfig::default().validate().is_ok());
    }
}
