//! HTTP handlers for ingestion endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{
    CancelUploadCommand, CancelUploadHandler, ChangeSessionStateCommand, ChangeSessionStateHandler,
    GenerateDescriptionCommand, GenerateDescriptionHandler, GetSessionStatusHandler, GetSessionStatusQuery,
    GetUploadHandler, GetUploadQuery, IngestionError, ResolveConflictCommand, ResolveConflictHandler,
    SendMessageCommand, SendMessageHandler, SessionAction, SessionRegistry, StartSessionCommand, StartSessionHandler,
    UploadDocumentCommand, UploadDocumentHandler, UploadView,
};
use crate::domain::extraction::UploadPolicy;
use crate::domain::foundation::{DomainError, SessionId, UploadId};
use crate::domain::project::{FieldPath, MergeError};
use crate::domain::session::SessionError;

use super::dto::{
    DescriptionResponse, ErrorResponse, HealthResponse, ResolveConflictRequest, ResolveConflictResponse,
    SendMessageRequest, SendMessageResponse, SessionStateResponse, StartSessionRequest, StartSessionResponse,
    SupportedFormatsResponse, UploadDocumentRequest, UploadDocumentResponse, UploadQuery,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct IngestionHandlers {
    start_handler: Arc<StartSessionHandler>,
    status_handler: Arc<GetSessionStatusHandler>,
    message_handler: Arc<SendMessageHandler>,
    upload_handler: Arc<UploadDocumentHandler>,
    get_upload_handler: Arc<GetUploadHandler>,
    cancel_upload_handler: Arc<CancelUploadHandler>,
    description_handler: Arc<GenerateDescriptionHandler>,
    state_handler: Arc<ChangeSessionStateHandler>,
    conflict_handler: Arc<ResolveConflictHandler>,
}

impl IngestionHandlers {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_handler: Arc<StartSessionHandler>,
        status_handler: Arc<GetSessionStatusHandler>,
        message_handler: Arc<SendMessageHandler>,
        upload_handler: Arc<UploadDocumentHandler>,
        get_upload_handler: Arc<GetUploadHandler>,
        cancel_upload_handler: Arc<CancelUploadHandler>,
        description_handler: Arc<GenerateDescriptionHandler>,
        state_handler: Arc<ChangeSessionStateHandler>,
        conflict_handler: Arc<ResolveConflictHandler>,
    ) -> Self {
        Self {
            start_handler,
            status_handler,
            message_handler,
            upload_handler,
            get_upload_handler,
            cancel_upload_handler,
            description_handler,
            state_handler,
            conflict_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/ingestion/sessions - Start a session
pub async fn start_session(
    State(handlers): State<IngestionHandlers>,
    body: Option<Json<StartSessionRequest>>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let cmd = StartSessionCommand {
        owner_tax_id: req.owner_tax_id,
    };

    match handlers.start_handler.handle(cmd).await {
        Ok(result) => (StatusCode::CREATED, Json(StartSessionResponse::from(result))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// GET /api/ingestion/sessions/:id - Status snapshot
pub async fn get_session(State(handlers): State<IngestionHandlers>, Path(session_id): Path<String>) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.status_handler.handle(GetSessionStatusQuery { session_id }).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// POST /api/ingestion/sessions/:id/messages - One conversational turn
pub async fn send_message(
    State(handlers): State<IngestionHandlers>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .message_handler
        .handle(SendMessageCommand::new(session_id, req.content))
        .await
    {
        Ok(result) => (StatusCode::OK, Json(SendMessageResponse::from(result))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// POST /api/ingestion/sessions/:id/documents - Upload a document
pub async fn upload_document(
    State(handlers): State<IngestionHandlers>,
    Path(session_id): Path<String>,
    Query(query): Query<UploadQuery>,
    Json(req): Json<UploadDocumentRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let document = match req.into_raw() {
        Ok(document) => document,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request(format!("content_base64 is not valid base64: {}", e))),
            )
                .into_response()
        }
    };

    let cmd = UploadDocumentCommand {
        session_id,
        document,
        run_async: query.run_async,
    };
    match handlers.upload_handler.handle(cmd).await {
        Ok(result) => {
            let status = if query.run_async && result.upload.is_some() && !result.duplicate {
                StatusCode::ACCEPTED
            } else {
                StatusCode::OK
            };
            (status, Json(UploadDocumentResponse::from(result))).into_response()
        }
        Err(e) => handle_ingestion_error(e),
    }
}

/// GET /api/ingestion/sessions/:id/documents/:upload_id - Upload status
pub async fn get_upload(
    State(handlers): State<IngestionHandlers>,
    Path((session_id, upload_id)): Path<(String, String)>,
) -> Response {
    let (session_id, upload_id) = match parse_upload_path(&session_id, &upload_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    match handlers
        .get_upload_handler
        .handle(GetUploadQuery { session_id, upload_id })
        .await
    {
        Ok(upload) => (StatusCode::OK, Json(UploadView::from(&upload))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// DELETE /api/ingestion/sessions/:id/documents/:upload_id - Cancel extraction
pub async fn cancel_upload(
    State(handlers): State<IngestionHandlers>,
    Path((session_id, upload_id)): Path<(String, String)>,
) -> Response {
    let (session_id, upload_id) = match parse_upload_path(&session_id, &upload_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    match handlers
        .cancel_upload_handler
        .handle(CancelUploadCommand { session_id, upload_id })
        .await
    {
        Ok(upload) => (StatusCode::OK, Json(UploadView::from(&upload))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// POST /api/ingestion/sessions/:id/description - Draft a description
pub async fn generate_description(
    State(handlers): State<IngestionHandlers>,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .description_handler
        .handle(GenerateDescriptionCommand { session_id })
        .await
    {
        Ok(result) => (StatusCode::OK, Json(DescriptionResponse::from(result))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// POST /api/ingestion/sessions/:id/pause
pub async fn pause_session(state: State<IngestionHandlers>, path: Path<String>) -> Response {
    change_state(state, path, SessionAction::Pause).await
}

/// POST /api/ingestion/sessions/:id/resume
pub async fn resume_session(state: State<IngestionHandlers>, path: Path<String>) -> Response {
    change_state(state, path, SessionAction::Resume).await
}

/// POST /api/ingestion/sessions/:id/cancel
pub async fn cancel_session(state: State<IngestionHandlers>, path: Path<String>) -> Response {
    change_state(state, path, SessionAction::Cancel).await
}

/// POST /api/ingestion/sessions/:id/finalize
pub async fn finalize_session(state: State<IngestionHandlers>, path: Path<String>) -> Response {
    change_state(state, path, SessionAction::Finalize).await
}

async fn change_state(
    State(handlers): State<IngestionHandlers>,
    Path(session_id): Path<String>,
    action: SessionAction,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers
        .state_handler
        .handle(ChangeSessionStateCommand { session_id, action })
        .await
    {
        Ok(result) => (StatusCode::OK, Json(SessionStateResponse::from(result))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// POST /api/ingestion/sessions/:id/conflicts/:field - Resolve a conflict
pub async fn resolve_conflict(
    State(handlers): State<IngestionHandlers>,
    Path((session_id, field)): Path<(String, String)>,
    Json(req): Json<ResolveConflictRequest>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let field = match field.parse::<FieldPath>() {
        Ok(field) => field,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(e.to_string()))).into_response(),
    };

    let cmd = ResolveConflictCommand {
        session_id,
        field,
        resolution: req.resolution,
    };
    match handlers.conflict_handler.handle(cmd).await {
        Ok(result) => (StatusCode::OK, Json(ResolveConflictResponse::from(result))).into_response(),
        Err(e) => handle_ingestion_error(e),
    }
}

/// GET /health - Liveness
pub async fn health(State(registry): State<SessionRegistry>) -> Response {
    let response = HealthResponse {
        status: "ok",
        active_sessions: registry.len().await,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/ingestion/supported-formats - Upload allow-list
pub async fn supported_formats(State(policy): State<UploadPolicy>) -> Response {
    (StatusCode::OK, Json(SupportedFormatsResponse::from(&policy))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn parse_session_id(raw: &str) -> Result<SessionId, Response> {
    raw.parse::<SessionId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid session ID")),
        )
            .into_response()
    })
}

fn parse_upload_path(session_id: &str, upload_id: &str) -> Result<(SessionId, UploadId), Response> {
    let session_id = parse_session_id(session_id)?;
    let upload_id = upload_id.parse::<UploadId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid upload ID")),
        )
            .into_response()
    })?;
    Ok((session_id, upload_id))
}

fn status_for(error: &IngestionError) -> StatusCode {
    match error {
        IngestionError::Session(SessionError::NotFound(_)) | IngestionError::UploadNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        IngestionError::Session(SessionError::Merge(MergeError::Invalid(_))) | IngestionError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        IngestionError::Session(_) | IngestionError::Cancelled => StatusCode::CONFLICT,
        IngestionError::EmptyMessage => StatusCode::BAD_REQUEST,
        IngestionError::ContextOverflow(_) | IngestionError::AIProvider(_) | IngestionError::ToolLog(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn handle_ingestion_error(error: IngestionError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "ingestion request failed");
    } else {
        tracing::debug!(error = %error, status = %status, "ingestion request rejected");
    }
    let body = ErrorResponse::from(DomainError::from(error));
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionStatus;

    #[test]
    fn not_found_maps_to_404() {
        let response = handle_ingestion_error(IngestionError::Session(SessionError::NotFound(SessionId::new())));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_ingestion_error(IngestionError::UploadNotFound(UploadId::new()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn state_errors_map_to_409() {
        let error = IngestionError::Session(SessionError::NotAcceptingInput(SessionStatus::Paused));
        assert_eq!(status_for(&error), StatusCode::CONFLICT);

        let error = IngestionError::Session(SessionError::DraftLocked(SessionStatus::Completed));
        assert_eq!(status_for(&error), StatusCode::CONFLICT);
    }

    #[test]
    fn empty_message_maps_to_400() {
        assert_eq!(status_for(&IngestionError::EmptyMessage), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn model_failure_maps_to_503() {
        let error = IngestionError::AIProvider(crate::ports::AIError::unavailable("down"));
        assert_eq!(status_for(&error), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_session_id_is_bad_request() {
        let response = parse_session_id("not-a-uuid").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
