//! HTTP surface: `/download` (POST and GET) and `/health`.

use anyhow::{Context, Result};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{AuthConfig, Config};
use crate::extractors::MediaExtractor;
use crate::pipeline::AudioPipeline;

mod auth;
mod errors;
mod handlers;

/// Shared handler state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AudioPipeline>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(config: &Config, extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            pipeline: Arc::new(AudioPipeline::new(extractor, &config.extraction)),
            auth: Arc::new(config.auth.clone()),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let download = Router::new()
        .route("/download", get(handlers::download_get).post(handlers::download_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(download)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config, extractor: Arc<dyn MediaExtractor>) -> Result<()> {
    let state = AppState::new(config, extractor);

    let temp_dir = state.pipeline.temp_dir().clone();
    fs_err::create_dir_all(&temp_dir).context("Failed to create temp directory")?;

    if state.auth.required_key().is_none() {
        tracing::warn!("No API key configured; /download accepts unauthenticated requests");
    }

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Listening on {} (temp dir {})", address, temp_dir.display());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
