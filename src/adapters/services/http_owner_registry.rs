//! HTTP client for the owner registry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{build_client, check_status, transport_error};
use crate::ports::{OwnerRecord, OwnerRegistry, ServiceError};

/// Looks owners up with `GET {base_url}/project-owners/{tax_id}`.
pub struct HttpOwnerRegistry {
    base_url: String,
    client: Client,
}

impl HttpOwnerRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout),
        }
    }

    fn owner_url(&self, tax_id: &str) -> String {
        format!("{}/project-owners/{}", self.base_url, tax_id)
    }
}

/// Wire shape of the registry's owner resource.
#[derive(Debug, Deserialize)]
struct OwnerResource {
    #[serde(alias = "nit")]
    tax_id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<OwnerResource> for OwnerRecord {
    fn from(resource: OwnerResource) -> Self {
        OwnerRecord {
            tax_id: resource.tax_id,
            name: resource.name,
            email: resource.email,
        }
    }
}

#[async_trait]
impl OwnerRegistry for HttpOwnerRegistry {
    #[tracing::instrument(skip(self))]
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<OwnerRecord>, ServiceError> {
        let response = self
            .client
            .get(self.owner_url(tax_id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "owner registry").await?;
        let resource: OwnerResource = response
            .json()
            .await
            .map_err(|e| ServiceError::unavailable(format!("unreadable owner payload: {}", e)))?;
        Ok(Some(resource.into()))
    }
}
