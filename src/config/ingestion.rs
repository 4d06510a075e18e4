//! Session, upload and turn behaviour

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Complete a session as soon as its draft is ready
    #[serde(default)]
    pub auto_finalize: bool,

    /// Also run model extraction over chat messages
    #[serde(default)]
    pub model_assisted_statements: bool,

    /// Messages kept per session before the oldest are dropped
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// How long completed or cancelled sessions stay queryable
    #[serde(default = "default_retention")]
    pub terminal_retention_secs: u64,

    /// How often the eviction sweep runs
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,

    /// Largest accepted document
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,

    /// Characters of flattened document text sent to the model
    #[serde(default = "default_extraction_chars")]
    pub extraction_input_chars: usize,

    /// Token cap for a conversational reply
    #[serde(default = "default_reply_tokens")]
    pub reply_max_tokens: u32,
}

impl IngestionConfig {
    pub fn terminal_retention(&self) -> Duration {
        Duration::from_secs(self.terminal_retention_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_history < 4 {
            return Err(ValidationError::OutOfRange("ingestion.max_history"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ValidationError::OutOfRange("ingestion.max_upload_bytes"));
        }
        if self.eviction_interval_secs == 0 {
            return Err(ValidationError::OutOfRange("ingestion.eviction_interval_secs"));
        }
        if self.extraction_input_chars == 0 || self.reply_max_tokens == 0 {
            return Err(ValidationError::OutOfRange("ingestion"));
        }
        Ok(())
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            auto_finalize: false,
            model_assisted_statements: false,
            max_history: default_max_history(),
            terminal_retention_secs: default_retention(),
            eviction_interval_secs: default_eviction_interval(),
            max_upload_bytes: default_max_upload(),
            extraction_input_chars: default_extraction_chars(),
            reply_max_tokens: default_reply_tokens(),
        }
    }
}

fn default_max_history() -> usize {
    50
}

fn default_retention() -> u64 {
    24 * 60 * 60
}

fn default_eviction_interval() -> u64 {
    300
}

fn default_max_upload() -> usize {
    10 * 1024 * 1024
}

fn default_extraction_chars() -> usize {
    12_000
}

fn default_reply_tokens() -> u32 {
    600
}
