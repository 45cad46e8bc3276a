//! API Server - HTTP server for REST API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::{self, AppState};
use crate::config::Config;
use crate::spam::SpamManager;

/// Request body cap; base64 screenshots are large
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(manager: Arc<SpamManager>, config: &Config) -> Self {
        Self {
            state: Arc::new(AppState::new(manager, config)),
            addr: config.server.listen_addr.clone(),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        // CORS configuration
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api_routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/analyze", post(handlers::analyze))
            .route("/analyze-image", post(handlers::analyze_image))
            .route("/retrain", post(handlers::retrain))
            .route("/history", get(handlers::history))
            .route("/stats", get(handlers::stats))
            .route("/model", get(handlers::model_info));

        Router::new()
            .nest("/api", api_routes)
            .route("/metrics", get(handlers::metrics))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                handlers::track_metrics,
            ))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
