//! Owner registry and project store endpoints

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// External project services. Either URL may be left unset, in which case
/// the in-memory implementation is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the owner registry
    pub owner_registry_url: Option<String>,

    /// Base URL of the project store
    pub project_store_url: Option<String>,

    /// HTTP client timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, url) in [
            ("services.owner_registry_url", &self.owner_registry_url),
            ("services.project_store_url", &self.project_store_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ValidationError::InvalidUrl(name));
                }
            }
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            owner_registry_url: None,
            project_store_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_urls_are_valid() {
        assert!(ServicesConfig::default().validate().is_ok());
    }

    #[test]
    fn urls_need_a_scheme() {
        let config = ServicesConfig {
            owner_registry_url: Some("registry.local".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUrl("services.owner_registry_url"))
        ));
    }
}
