//! Runtime knobs for the ingestion engine, assembled from configuration.

use std::time::Duration;

use crate::domain::conversation::ContextConfig;
use crate::domain::extraction::{ConfidencePolicy, UploadPolicy};
use crate::domain::project::MergeConfig;
use crate::domain::session::DEFAULT_MAX_HISTORY;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    /// Per-attempt deadline for one tool call.
    pub timeout: Duration,
    /// Model/tool round trips allowed in one turn.
    pub max_rounds: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_rounds: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionSettings {
    /// Complete the session as soon as the draft is ready.
    pub auto_finalize: bool,
    /// Run the model extraction pass over user messages too.
    pub model_assisted_statements: bool,
    pub max_history: usize,
    pub terminal_retention: Duration,
    /// Characters of flattened document text sent to the model pass.
    pub extraction_input_chars: usize,
    pub reply_max_tokens: u32,
    pub upload: UploadPolicy,
    pub confidence: ConfidencePolicy,
    pub merge: MergeConfig,
    pub context: ContextConfig,
    pub tools: ToolSettings,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            auto_finalize: false,
            model_assisted_statements: false,
            max_history: DEFAULT_MAX_HISTORY,
            terminal_retention: Duration::from_secs(24 * 60 * 60),
            extraction_input_chars: 12_000,
            reply_max_tokens: 600,
            upload: UploadPolicy::default(),
            confidence: ConfidencePolicy::default(),
            merge: MergeConfig::default(),
            context: ContextConfig::default(),
            tools: ToolSettings::default(),
        }
    }
}
