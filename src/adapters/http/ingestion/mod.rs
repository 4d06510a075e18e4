//! HTTP adapter for ingestion endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    DescriptionResponse, ErrorResponse, HealthResponse, ResolveConflictRequest, ResolveConflictResponse,
    SendMessageRequest, SendMessageResponse, SessionStateResponse, StartSessionRequest, StartSessionResponse,
    SupportedFormat, SupportedFormatsResponse, ToolCallSummary, UploadDocumentRequest, UploadDocumentResponse,
    UploadQuery,
};
pub use handlers::IngestionHandlers;
pub use routes::{format_routes, health_routes, ingestion_routes, SUPPORTED_FORMATS_PATH};
