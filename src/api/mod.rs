// src/api/mod.rs - HTTP surface: prompt submission, SSE streams, stop requests

pub mod handlers;
pub mod types;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::infra::config::ServerConfig;
use crate::relay::StreamRelay;
use crate::topic::TopicFilter;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: StreamRelay,
    pub topic: Arc<TopicFilter>,
    /// Where accepted image uploads are written.
    pub upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(relay: StreamRelay, topic: TopicFilter, upload_dir: PathBuf) -> Self {
        Self {
            relay,
            topic: Arc::new(topic),
            upload_dir: Arc::new(upload_dir),
        }
    }
}

/// Build the axum router with all routes. Static files are the fallback.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/request-stream", post(handlers::request_stream))
        .route("/stream/{id}", get(handlers::stream))
        .route("/stop/{id}", post(handlers::stop_stream))
        .route("/health", get(handlers::health))
        .fallback_service(ServeDir::new(&server.static_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {o}");
                None
            }
        })
        .collect();
    if !origins.is_empty() {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    router.with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Unhandled error: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something broke on the server!",
    )
        .into_response()
}

/// Serve until Ctrl-C.
pub async fn start_server(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let router = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server is running on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
