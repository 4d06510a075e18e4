//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid timeout")]
    InvalidTimeout,

    #[error("Request body limit {limit} cannot carry an encoded upload of {needed} bytes")]
    BodyTooSmall { limit: usize, needed: usize },

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("Value out of range: {0}")]
    OutOfRange(&'static str),
}
