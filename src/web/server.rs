//! HTTP server implementation

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{get_handler, set_handler, stats_handler};
use crate::service::KvService;

/// Build the application router
pub fn router(service: KvService) -> Router {
    Router::new()
        .route("/get", post(get_handler))
        .route("/set", post(set_handler))
        .route("/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve the HTTP gateway on an already bound listener until `shutdown` fires
pub async fn run_web(
    listener: TcpListener,
    service: KvService,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!("HTTP gateway available at http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP gateway stopped");
    Ok(())
}
