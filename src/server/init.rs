//! Server initialization and run loop.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use amora_core::{AuthStore, ChatStore, CodeStore, SuggestionAssembler};
use amora_llm::{ChatProvider, QwenConfig, QwenProvider};

use super::config::LlmConfig;
use super::loader::load_config;
use crate::websocket::ConnectionRegistry;
use crate::Cli;

/// Bring the whole backend up and serve until shutdown.
pub async fn run(cli: Cli) -> Result<()> {
    info!("Starting Amora backend v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config().context("Failed to load configuration")?;

    // CLI flags win over files and environment.
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    info!("Configuration loaded");

    let store = Arc::new(
        ChatStore::connect(Path::new(&config.database.path))
            .await
            .context("Failed to open database")?,
    );
    store
        .health_check()
        .await
        .context("Database ping failed")?;
    info!(path = %config.database.path, "Database ready");

    let auth_store = Arc::new(AuthStore::new());
    let code_store = Arc::new(CodeStore::new());
    let registry = Arc::new(ConnectionRegistry::new());

    start_code_cleanup_task(&code_store);

    let assembler = Arc::new(match resolve_provider(&config.llm) {
        Some(provider) => {
            info!(provider = provider.name(), "LLM provider initialized");
            SuggestionAssembler::new(Some(provider))
        }
        None => {
            info!("No LLM provider configured; serving fallback suggestions");
            SuggestionAssembler::without_provider()
        }
    });

    let app = Router::new()
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .layer(Extension(store))
        .layer(Extension(auth_store))
        .layer(Extension(code_store))
        .layer(Extension(registry))
        .layer(Extension(assembler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: std::net::SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Amora shutdown complete");
    Ok(())
}

/// Build the Qwen provider from config, falling back to environment keys.
/// `None` means suggestions run in fallback-only mode.
fn resolve_provider(llm: &LlmConfig) -> Option<Arc<dyn ChatProvider>> {
    let config = match &llm.api_key {
        Some(api_key) if !api_key.is_empty() => {
            let mut config = QwenConfig::new(api_key.clone());
            if let Some(base_url) = &llm.base_url {
                config = config.with_base_url(base_url.clone());
            }
            if let Some(model) = &llm.model {
                config = config.with_model(model.clone());
            }
            config
        }
        _ => match QwenConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                debug!(error = %err, "Qwen provider not configured");
                return None;
            }
        },
    };

    Some(Arc::new(QwenProvider::new(config)))
}

/// Evict expired verification codes in the background.
fn start_code_cleanup_task(code_store: &Arc<CodeStore>) {
    let codes = code_store.clone();
    tokio::spawn(async move {
        let cleanup_interval = tokio::time::Duration::from_secs(60);
        loop {
            tokio::time::sleep(cleanup_interval).await;
            codes.cleanup().await;
        }
    });
    info!("Verification code cleanup task started (60s interval)");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
