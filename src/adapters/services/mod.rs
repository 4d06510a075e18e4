//! Project service adapters - owner registry and project store clients.
//!
//! - `HttpOwnerRegistry` / `HttpProjectStore` - JSON-over-HTTP clients (reqwest)
//! - `InMemoryOwnerRegistry` / `InMemoryProjectStore` - Scriptable fakes for
//!   tests and local development

mod http_owner_registry;
mod http_project_store;
mod in_memory;

pub use http_owner_registry::HttpOwnerRegistry;
pub use http_project_store::HttpProjectStore;
pub use in_memory::{InMemoryOwnerRegistry, InMemoryProjectStore};

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::ports::ServiceError;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub(crate) fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::unavailable(err.to_string())
    }
}

/// Maps non-success statuses onto the service error taxonomy.
pub(crate) async fn check_status(response: Response, subject: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, subject, &body))
}

fn status_error(status: StatusCode, subject: &str, body: &str) -> ServiceError {
    match status {
        StatusCode::NOT_FOUND => ServiceError::not_found(subject.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::Timeout,
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            ServiceError::unavailable(format!("{} returned {}", subject, s))
        }
        s => ServiceError::rejected(format!("{} returned {}: {}", subject, s, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_service_errors() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "owner 900", ""),
            ServiceError::not_found("owner 900")
        );
        assert_eq!(status_error(StatusCode::GATEWAY_TIMEOUT, "x", ""), ServiceError::Timeout);
        assert!(status_error(StatusCode::BAD_GATEWAY, "x", "").is_transient());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "x", "").is_transient());
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "x", "bad price"),
            ServiceError::Rejected(msg) if msg.contains("bad price")
        ));
    }
}
