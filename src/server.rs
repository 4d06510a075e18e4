//! Composition root: wires adapters into handlers and handlers into a router.
//!
//! `IngestionApp::new` takes already-built ports, which is what the tests
//! use with mocks. `IngestionApp::from_config` picks the adapters named by
//! configuration and is what the binary calls.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use http::HeaderValue;
use axum::Router;
use secrecy::ExposeSecret;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::ai::{AISummarizer, MockAIProvider, OpenAIConfig, OpenAIProvider};
use crate::adapters::document::FormatDispatchReader;
use crate::adapters::http::ingestion::{format_routes, health_routes, ingestion_routes, IngestionHandlers};
use crate::adapters::services::{HttpOwnerRegistry, HttpProjectStore, InMemoryOwnerRegistry, InMemoryProjectStore};
use crate::adapters::storage::InMemoryToolCallLog;
use crate::application::{
    CancelUploadHandler, ChangeSessionStateHandler, ContextBuilder, DescriptionWriter, DocumentProcessor,
    FieldExtractor, GenerateDescriptionHandler, GetSessionStatusHandler, GetUploadHandler, IngestionSettings,
    ResolveConflictHandler, SendMessageHandler, SessionRegistry, StartSessionHandler, ToolOrchestrator,
    UploadDocumentHandler,
};
use crate::config::{AiProvider, AppConfig, ServerConfig};
use crate::domain::project::FieldMerger;
use crate::ports::{AIProvider, ConversationSummarizer, DocumentTextReader, OwnerRegistry, ProjectStore, ToolCallLog};

/// Path prefix of the session endpoints.
pub const SESSIONS_PATH: &str = "/api/ingestion/sessions";

/// The external collaborators of the engine.
#[derive(Clone)]
pub struct IngestionDeps {
    pub ai: Arc<dyn AIProvider>,
    pub summarizer: Arc<dyn ConversationSummarizer>,
    pub reader: Arc<dyn DocumentTextReader>,
    pub owners: Arc<dyn OwnerRegistry>,
    pub projects: Arc<dyn ProjectStore>,
    pub tool_log: Arc<dyn ToolCallLog>,
    /// Token cap for generated descriptions.
    pub description_max_tokens: u32,
}

impl IngestionDeps {
    /// Builds every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let ai: Arc<dyn AIProvider> = match config.ai.provider {
            AiProvider::OpenAI => {
                let key = config
                    .ai
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret().clone())
                    .unwrap_or_default();
                let provider_config = OpenAIConfig::new(key)
                    .with_model(config.ai.model.clone())
                    .with_base_url(config.ai.base_url.clone())
                    .with_timeout(config.ai.timeout())
                    .with_max_retries(config.ai.max_retries);
                Arc::new(OpenAIProvider::new(provider_config))
            }
            AiProvider::Mock => {
                tracing::warn!("using the scripted mock provider, replies are canned");
                Arc::new(MockAIProvider::new())
            }
        };

        let summarizer = Arc::new(AISummarizer::new(Arc::clone(&ai)).with_max_tokens(config.ai.summary_max_tokens));

        let timeout = config.services.timeout();
        let owners: Arc<dyn OwnerRegistry> = match &config.services.owner_registry_url {
            Some(url) => Arc::new(HttpOwnerRegistry::new(url.clone(), timeout)),
            None => {
                tracing::info!("no owner registry configured, using in-memory registry");
                Arc::new(InMemoryOwnerRegistry::new())
            }
        };
        let projects: Arc<dyn ProjectStore> = match &config.services.project_store_url {
            Some(url) => Arc::new(HttpProjectStore::new(url.clone(), timeout)),
            None => {
                tracing::info!("no project store configured, using in-memory store");
                Arc::new(InMemoryProjectStore::new())
            }
        };

        Self {
            ai,
            summarizer,
            reader: Arc::new(FormatDispatchReader::new()),
            owners,
            projects,
            tool_log: Arc::new(InMemoryToolCallLog::new()),
            description_max_tokens: config.ai.description_max_tokens,
        }
    }
}

/// Every handler of the engine over one shared session registry.
#[derive(Clone)]
pub struct IngestionApp {
    pub registry: SessionRegistry,
    pub settings: IngestionSettings,
    pub tool_log: Arc<dyn ToolCallLog>,
    pub start_session: Arc<StartSessionHandler>,
    pub session_status: Arc<GetSessionStatusHandler>,
    pub send_message: Arc<SendMessageHandler>,
    pub upload_document: Arc<UploadDocumentHandler>,
    pub get_upload: Arc<GetUploadHandler>,
    pub cancel_upload: Arc<CancelUploadHandler>,
    pub generate_description: Arc<GenerateDescriptionHandler>,
    pub change_state: Arc<ChangeSessionStateHandler>,
    pub resolve_conflict: Arc<ResolveConflictHandler>,
}

impl IngestionApp {
    pub fn new(deps: IngestionDeps, settings: IngestionSettings) -> Self {
        let registry = SessionRegistry::new();
        let merger = FieldMerger::new(settings.merge);

        let writer = Arc::new(DescriptionWriter::new(Arc::clone(&deps.ai)).with_max_tokens(deps.description_max_tokens));
        let extractor = Arc::new(FieldExtractor::new(
            Arc::clone(&deps.ai),
            settings.confidence,
            settings.extraction_input_chars,
        ));
        let context = Arc::new(ContextBuilder::new(settings.context, Arc::clone(&deps.summarizer)));
        let orchestrator = Arc::new(ToolOrchestrator::new(
            Arc::clone(&deps.owners),
            Arc::clone(&deps.projects),
            Arc::clone(&writer),
            Arc::clone(&deps.tool_log),
            merger.clone(),
            settings.confidence,
            settings.tools,
        ));
        let processor = DocumentProcessor::new(
            Arc::clone(&deps.reader),
            Arc::clone(&extractor),
            merger.clone(),
            settings.auto_finalize,
        );

        Self {
            start_session: Arc::new(StartSessionHandler::new(
                registry.clone(),
                merger.clone(),
                settings.confidence,
                settings.max_history,
            )),
            session_status: Arc::new(GetSessionStatusHandler::new(registry.clone())),
            send_message: Arc::new(SendMessageHandler::new(
                registry.clone(),
                Arc::clone(&deps.ai),
                context,
                extractor,
                orchestrator,
                settings.clone(),
            )),
            upload_document: Arc::new(UploadDocumentHandler::new(registry.clone(), processor, settings.upload.clone())),
            get_upload: Arc::new(GetUploadHandler::new(registry.clone())),
            cancel_upload: Arc::new(CancelUploadHandler::new(registry.clone())),
            generate_description: Arc::new(GenerateDescriptionHandler::new(
                registry.clone(),
                writer,
                merger.clone(),
                settings.confidence,
            )),
            change_state: Arc::new(ChangeSessionStateHandler::new(registry.clone())),
            resolve_conflict: Arc::new(ResolveConflictHandler::new(
                registry.clone(),
                merger,
                settings.auto_finalize,
            )),
            tool_log: deps.tool_log,
            registry,
            settings,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(IngestionDeps::from_config(config), config.ingestion_settings())
    }

    pub fn http_handlers(&self) -> IngestionHandlers {
        IngestionHandlers::new(
            Arc::clone(&self.start_session),
            Arc::clone(&self.session_status),
            Arc::clone(&self.send_message),
            Arc::clone(&self.upload_document),
            Arc::clone(&self.get_upload),
            Arc::clone(&self.cancel_upload),
            Arc::clone(&self.generate_description),
            Arc::clone(&self.change_state),
            Arc::clone(&self.resolve_conflict),
        )
    }

    /// Routes without transport middleware.
    pub fn routes(&self) -> Router {
        Router::new()
            .nest(SESSIONS_PATH, ingestion_routes(self.http_handlers()))
            .merge(format_routes(self.settings.upload.clone()))
            .merge(health_routes(self.registry.clone()))
    }

    /// The full HTTP application.
    pub fn router(&self, server: &ServerConfig) -> Router {
        self.routes()
            .layer(DefaultBodyLimit::max(server.body_limit_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
            .layer(cors_layer(server))
            .layer(TraceLayer::new_for_http())
    }

    /// Drops terminal sessions past their retention, and their tool records.
    pub async fn evict_expired(&self) -> usize {
        let evicted = self.registry.evict_expired(self.settings.terminal_retention).await;
        for session_id in &evicted {
            if let Err(err) = self.tool_log.forget_session(*session_id).await {
                tracing::warn!(%session_id, error = %err, "failed to drop tool call records");
            }
        }
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "evicted terminal sessions");
        }
        evicted.len()
    }

    /// Runs `evict_expired` on a fixed interval until the task is dropped.
    pub fn spawn_eviction(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let app = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                app.evict_expired().await;
            }
        })
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ChangeSessionStateCommand, SessionAction, StartSessionCommand};
    use crate::domain::session::SessionStatus;

    fn app(retention: Duration) -> IngestionApp {
        let ai: Arc<dyn AIProvider> = Arc::new(MockAIProvider::new());
        let deps = IngestionDeps {
            summarizer: Arc::new(AISummarizer::new(Arc::clone(&ai))),
            ai,
            reader: Arc::new(FormatDispatchReader::new()),
            owners: Arc::new(InMemoryOwnerRegistry::new()),
            projects: Arc::new(InMemoryProjectStore::new()),
            tool_log: Arc::new(InMemoryToolCallLog::new()),
            description_max_tokens: 200,
        };
        let settings = IngestionSettings {
            terminal_retention: retention,
            ..Default::default()
        };
        IngestionApp::new(deps, settings)
    }

    #[tokio::test]
    async fn eviction_drops_only_terminal_sessions() {
        let app = app(Duration::ZERO);
        app.start_session.handle(StartSessionCommand::default()).await.unwrap();
        let done = app.start_session.handle(StartSessionCommand::default()).await.unwrap();
        let handle = app.registry.get(done.session_id).await.unwrap();
        handle.lock().await.accept_input().unwrap();

        let cancelled = app
            .change_state
            .handle(ChangeSessionStateCommand {
                session_id: done.session_id,
                action: SessionAction::Cancel,
            })
            .await
            .unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(app.evict_expired().await, 1);
        assert_eq!(app.registry.len().await, 1);
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let response = app(Duration::from_secs(60))
            .router(&ServerConfig::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn supported_formats_route_lists_the_upload_policy() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let response = app(Duration::from_secs(60))
            .router(&ServerConfig::default())
            .oneshot(Request::get("/api/ingestion/supported-formats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let extensions: Vec<&str> = json["formats"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["extension"].as_str())
            .collect();
        assert_eq!(extensions, vec![".pdf", ".docx", ".xlsx", ".xls"]);
        assert_eq!(json["max_size_bytes"], 10 * 1024 * 1024);
    }
}
