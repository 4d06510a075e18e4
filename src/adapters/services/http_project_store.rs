//! HTTP client for the project store.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use super::{build_client, check_status, transport_error};
use crate::domain::foundation::ProjectId;
use crate::ports::{ProjectRecord, ProjectStore, ServiceError};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Talks to `{base_url}/projects`. Payloads are flat JSON objects keyed by
/// dotted field path; the store assigns the `id`. Creates send the
/// `Idempotency-Key` header so the store can answer a retried POST with the
/// project it already made.
pub struct HttpProjectStore {
    base_url: String,
    client: Client,
}

impl HttpProjectStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/projects", self.base_url)
    }

    fn project_url(&self, id: &ProjectId) -> String {
        format!("{}/projects/{}", self.base_url, id.as_str())
    }

    fn create_request(&self, idempotency_key: &str, payload: &Map<String, Value>) -> reqwest::RequestBuilder {
        self.client
            .post(self.collection_url())
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(payload)
    }

    async fn read_record(response: reqwest::Response) -> Result<ProjectRecord, ServiceError> {
        let body: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| ServiceError::unavailable(format!("unreadable project payload: {}", e)))?;
        record_from_body(body)
    }
}

/// Splits the store's `id` from the remaining fields. Numeric ids are
/// accepted and kept as strings.
fn record_from_body(mut body: Map<String, Value>) -> Result<ProjectRecord, ServiceError> {
    let raw_id = match body.remove("id") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ServiceError::unavailable("project payload has no id")),
    };
    let id = ProjectId::new(raw_id).map_err(|e| ServiceError::unavailable(e.to_string()))?;
    Ok(ProjectRecord { id, fields: body })
}

#[async_trait]
impl ProjectStore for HttpProjectStore {
    #[tracing::instrument(skip(self, payload), fields(field_count = payload.len()))]
    async fn create(&self, idempotency_key: &str, payload: Map<String, Value>) -> Result<ProjectId, ServiceError> {
        let response = self
            .create_request(idempotency_key, &payload)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "project store").await?;
        Ok(Self::read_record(response).await?.id)
    }

    #[tracing::instrument(skip(self, payload), fields(project_id = %id.as_str()))]
    async fn update(&self, id: &ProjectId, payload: Map<String, Value>) -> Result<ProjectRecord, ServiceError> {
        let response = self
            .client
            .put(self.project_url(id))
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &format!("project {}", id.as_str())).await?;
        Self::read_record(response).await
    }

    #[tracing::instrument(skip(self), fields(project_id = %id.as_str()))]
    async fn get(&self, id: &ProjectId) -> Result<ProjectRecord, ServiceError> {
        let response = self
            .client
            .get(self.project_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &format!("project {}", id.as_str())).await?;
        Self::read_record(response).await
    }
}
