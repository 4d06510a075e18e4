//! HTTP routes for ingestion endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_session, cancel_upload, finalize_session, generate_description, get_session, get_upload, health,
    pause_session, resolve_conflict, resume_session, send_message, start_session, supported_formats,
    upload_document, IngestionHandlers,
};
use crate::application::SessionRegistry;
use crate::domain::extraction::UploadPolicy;

pub const SUPPORTED_FORMATS_PATH: &str = "/api/ingestion/supported-formats";

/// Creates the ingestion router; nest it under `/api/ingestion/sessions`.
pub fn ingestion_routes(handlers: IngestionHandlers) -> Router {
    Router::new()
        .route("/", post(start_session))
        .route("/:id", get(get_session))
        .route("/:id/messages", post(send_message))
        .route("/:id/documents", post(upload_document))
        .route("/:id/documents/:upload_id", get(get_upload).delete(cancel_upload))
        .route("/:id/description", post(generate_description))
        .route("/:id/pause", post(pause_session))
        .route("/:id/resume", post(resume_session))
        .route("/:id/cancel", post(cancel_session))
        .route("/:id/finalize", post(finalize_session))
        .route("/:id/conflicts/:field", post(resolve_conflict))
        .with_state(handlers)
}

pub fn health_routes(registry: SessionRegistry) -> Router {
    Router::new().route("/health", get(health)).with_state(registry)
}

pub fn format_routes(policy: UploadPolicy) -> Router {
    Router::new()
        .route(SUPPORTED_FORMATS_PATH, get(supported_formats))
        .with_state(policy)
}
