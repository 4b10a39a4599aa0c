//! `api` crate — HTTP surface.
//!
//! Exposes:
//!   GET    /health
//!   POST   /api/v1/execute
//!   POST   /webhook/{path}

pub mod error;
pub mod handlers;

use std::future::Future;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use error::ApiError;
pub use handlers::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/execute", post(handlers::executions::execute))
        .route("/webhook/:path", post(handlers::webhooks::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router on `bind` until `shutdown` resolves.
pub async fn serve<F>(bind: &str, state: AppState, shutdown: F) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind).await?;
    serve_listener(listener, state, shutdown).await
}

/// Serve the router on an already bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
