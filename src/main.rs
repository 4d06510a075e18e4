// Entry point for the ingestion API server

use project_ingestion::config::AppConfig;
use project_ingestion::server::IngestionApp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    config.validate()?;
    tracing::info!(deployment = ?config.server.deployment, provider = ?config.ai.provider, "configuration loaded");

    let app = IngestionApp::from_config(&config);
    let eviction = app.spawn_eviction(config.ingestion.eviction_interval());
    let router = app.router(&config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "project ingestion listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    eviction.abort();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
