//! Tool execution limits

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Deadline for one attempt of one tool call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Model/tool round trips allowed per turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_rounds == 0 || self.max_rounds > 16 {
            return Err(ValidationError::OutOfRange("tools.max_rounds"));
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_rounds() -> u32 {
    4
}
