// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP server for the embedding API
//!
//! The server owns one encoder for its whole lifetime. Loading happens
//! before the listener binds, so no request can observe a half-initialized
//! process; a load failure means the process never starts serving.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use sysinfo::System;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::embed::embed_handler;
use crate::api::errors::ApiError;
use crate::api::handlers::{HealthResponse, InfoResponse};
use crate::embeddings::{
    Embedder, HashEmbedder, ModelInfo, EMBEDDING_DIMENSION, MAX_SEQUENCE_LENGTH,
};
use crate::monitoring::ApiMetrics;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub enable_error_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8001".to_string(),
            enable_error_details: false,
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Process-wide encoder, loaded once at startup and shared read-only
    pub encoder: Arc<dyn Embedder>,
    /// Descriptor of the loaded model
    pub model: ModelInfo,
    /// Prometheus collectors
    pub metrics: ApiMetrics,
    /// When this process started serving
    pub started_at: DateTime<Utc>,
    /// Whether internal error text is exposed to clients
    pub error_details: bool,
}

impl AppState {
    pub fn new(encoder: Arc<dyn Embedder>, model: ModelInfo, error_details: bool) -> Result<Self> {
        Ok(Self {
            encoder,
            model,
            metrics: ApiMetrics::new()?,
            started_at: Utc::now(),
            error_details,
        })
    }

    /// State backed by the deterministic hash encoder, so router tests run
    /// without model files
    pub fn new_for_test() -> Self {
        let encoder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSION));
        let model = ModelInfo {
            name: encoder.model_name().to_string(),
            dimension: encoder.dimension(),
            max_sequence_length: MAX_SEQUENCE_LENGTH,
            device: encoder.device().to_string(),
            load_time_ms: 0,
        };

        Self {
            encoder,
            model,
            metrics: ApiMetrics::new().expect("fresh registry accepts collectors"),
            started_at: Utc::now(),
            error_details: true,
        }
    }
}

/// Builds the service router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/embed", post(embed_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The running HTTP server
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
    listener: Option<TcpListener>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Binds the listener and starts serving in a background task
    pub async fn new(
        config: ApiConfig,
        encoder: Arc<dyn Embedder>,
        model: ModelInfo,
    ) -> Result<Self> {
        // Parse the address
        let addr: SocketAddr = config.listen_addr.parse()?;

        // Bind to the address
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let state = AppState::new(encoder, model, config.enable_error_details)?;

        let mut server = Self {
            addr: actual_addr,
            state,
            listener: Some(listener),
            shutdown_tx: None,
        };

        server.start_http_server().await;

        info!("🚀 API server listening on {}", actual_addr);
        Ok(server)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Descriptor of the model this server serves
    pub fn model(&self) -> &ModelInfo {
        &self.state.model
    }

    async fn start_http_server(&mut self) {
        if let Some(listener) = self.listener.take() {
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            self.shutdown_tx = Some(shutdown_tx);

            let app = create_router(self.state.clone());

            tokio::spawn(async move {
                let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });

                let _ = serve_future.await;
            });
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// Handler functions as free functions

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::response::Json(HealthResponse {
        status: "healthy".to_string(),
        model: state.model.name.clone(),
        dimension: state.model.dimension,
    })
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    let mut sys = System::new_all();
    sys.refresh_all();
    let memory_rss_mb = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|p| p.memory() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);

    axum::response::Json(InfoResponse {
        service: "semantic-embed-service".to_string(),
        version: crate::version::VERSION_NUMBER.to_string(),
        model: state.model.clone(),
        uptime_secs,
        total_requests: state.metrics.embed_requests_total.get(),
        cpu_count: sys.cpus().len(),
        memory_rss_mb,
    })
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            ApiError::InternalError(format!("Failed to render metrics: {}", e)).into_response()
        }
    }
}
