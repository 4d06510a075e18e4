//! Listener settings for the ingestion API.

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

/// Longest request the API will hold open. A message turn can run several
/// model and tool rounds, so this is generous.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Where the API listens and how it treats requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Production switches logging to JSON.
    #[serde(default)]
    pub deployment: Deployment,

    /// `RUST_LOG`-style filter, used when `RUST_LOG` itself is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whole-request deadline, covering every model and tool round of a turn.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted request body. Documents arrive base64 encoded inside
    /// JSON, so this must exceed the upload limit by a third.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Comma-separated browser origins; unset allows any.
    pub cors_origins: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    #[default]
    #[serde(alias = "development")]
    Local,
    Staging,
    Production,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ValidationError::InvalidAddress(raw))
    }

    pub fn is_production(&self) -> bool {
        self.deployment == Deployment::Production
    }

    /// Configured origins, trimmed, with blanks dropped.
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        self.socket_addr().map(|_| ())
    }

    /// Checks that a document of `max_upload_bytes`, once base64 encoded,
    /// still fits in a request body.
    pub fn validate_upload_fits(&self, max_upload_bytes: usize) -> Result<(), ValidationError> {
        let needed = base64_len(max_upload_bytes);
        if self.body_limit_bytes < needed {
            return Err(ValidationError::BodyTooSmall {
                limit: self.body_limit_bytes,
                needed,
            });
        }
        Ok(())
    }
}

fn base64_len(bytes: usize) -> usize {
    bytes.div_ceil(3) * 4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            deployment: Deployment::default(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            cors_origins: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,project_ingestion=debug".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}
