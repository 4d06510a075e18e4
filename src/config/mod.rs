//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PROJECT_INGESTION` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use project_ingestion::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! let settings = config.ingestion_settings();
//! println!("auto finalize: {}", settings.auto_finalize);
//! ```

mod ai;
mod context;
mod error;
mod ingestion;
mod merge;
mod server;
mod services;
mod tools;

pub use ai::{AiConfig, AiProvider};
pub use context::ContextWindowConfig;
pub use error::{ConfigError, ValidationError};
pub use ingestion::IngestionConfig;
pub use merge::MergeSettingsConfig;
pub use server::{Deployment, ServerConfig};
pub use services::ServicesConfig;
pub use tools::ToolsConfig;

use serde::Deserialize;

use crate::application::{IngestionSettings, ToolSettings};
use crate::domain::conversation::{ContextConfig, TokenBudget};
use crate::domain::extraction::{DocumentFormat, UploadPolicy};
use crate::domain::project::MergeConfig;

/// Root application configuration
///
/// Every section has defaults; only the model API key is required when the
/// OpenAI provider is selected. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub context: ContextWindowConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub merge: MergeSettingsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PROJECT_INGESTION` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PROJECT_INGESTION__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PROJECT_INGESTION__MERGE__CONFIDENCE__PATTERN_MATCH=0.85`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PROJECT_INGESTION")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.server.validate_upload_fits(self.ingestion.max_upload_bytes)?;
        self.ai.validate()?;
        self.services.validate()?;
        self.ingestion.validate()?;
        self.context.validate()?;
        self.tools.validate()?;
        self.merge.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Runtime knobs handed to the application layer.
    pub fn ingestion_settings(&self) -> IngestionSettings {
        IngestionSettings {
            auto_finalize: self.ingestion.auto_finalize,
            model_assisted_statements: self.ingestion.model_assisted_statements,
            max_history: self.ingestion.max_history,
            terminal_retention: self.ingestion.terminal_retention(),
            extraction_input_chars: self.ingestion.extraction_input_chars,
            reply_max_tokens: self.ingestion.reply_max_tokens,
            upload: UploadPolicy {
                max_bytes: self.ingestion.max_upload_bytes,
                allowed: DocumentFormat::ALL.to_vec(),
            },
            confidence: self.merge.confidence,
            merge: MergeConfig {
                materiality_threshold: self.merge.materiality_threshold,
            },
            context: ContextConfig {
                budget: TokenBudget::new(self.context.max_context_tokens, self.context.reserved_for_response),
                high_water_ratio: self.context.high_water_ratio,
                retained_messages: self.context.retained_messages,
            },
            tools: ToolSettings {
                timeout: self.tools.timeout(),
                max_rounds: self.tools.max_rounds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "PROJECT_INGESTION__AI__API_KEY",
        "PROJECT_INGESTION__SERVER__PORT",
        "PROJECT_INGESTION__INGESTION__AUTO_FINALIZE",
        "PROJECT_INGESTION__TOOLS__TIMEOUT_MS",
        "PROJECT_INGESTION__SERVER__DEPLOYMENT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("PROJECT_INGESTION__AI__API_KEY", "sk-test");
        env::set_var("PROJECT_INGESTION__SERVER__PORT", "3000");
        env::set_var("PROJECT_INGESTION__INGESTION__AUTO_FINALIZE", "true");
        env::set_var("PROJECT_INGESTION__TOOLS__TIMEOUT_MS", "2500");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.ingestion.auto_finalize);
        assert!(config.validate().is_ok());
        assert_eq!(config.ingestion_settings().tools.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert!(matches!(config.validate(), Err(ValidationError::MissingRequired(_))));
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("PROJECT_INGESTION__SERVER__DEPLOYMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_upload_limit_must_fit_request_body() {
        let mut config = AppConfig::default();
        config.ai.provider = AiProvider::Mock;
        config.ingestion.max_upload_bytes = 15 * 1024 * 1024;

        assert!(matches!(config.validate(), Err(ValidationError::BodyTooSmall { .. })));
    }

    #[test]
    fn test_settings_mirror_sections() {
        let config = AppConfig::default();
        let settings = config.ingestion_settings();

        assert_eq!(settings, IngestionSettings::default());
    }
}
