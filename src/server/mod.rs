use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::engine::SequencingEngine;
use crate::error::{CovisitError, CovisitResult};

pub mod handlers;

pub type AppState = Arc<SequencingEngine>;

/// All routes, with request tracing and permissive CORS.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graph/status", get(handlers::graph_status))
        .route("/graph/train", post(handlers::train_graph))
        .route("/graph/suggest-next", post(handlers::suggest_next))
        .route("/graph/complete-day", post(handlers::complete_day))
        .route("/graph/optimize-itinerary", post(handlers::optimize_itinerary))
        .with_state(engine)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn run_http_server(config: &ServerConfig, engine: AppState) -> CovisitResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|err| CovisitError::Config(format!("invalid server address: {err}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| CovisitError::Internal(format!("failed to bind server: {err}")))?;

    info!(%addr, "Listening");

    axum::serve(listener, router(engine))
        .await
        .map_err(|err| CovisitError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
