//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::CloudError;
use crate::server::handlers::{
    action_handler, catalog_handler, catalog_page_handler, favorite_handler, health_handler,
    instantiate_handler, metrics_handler, refresh_handler, save_cache_handler, search_handler,
    tasks_handler, vapp_handler, vapps_handler, version_handler, vms_handler,
};
use crate::server::state::ServerState;

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Model
        .route("/vapps", get(vapps_handler))
        .route("/vapps/{id}", get(vapp_handler))
        .route("/vms", get(vms_handler))
        .route("/tasks", get(tasks_handler))
        .route("/metrics", get(metrics_handler))
        .route("/refresh", post(refresh_handler))
        // Catalog
        .route("/catalog", get(catalog_handler))
        .route("/catalog/page", post(catalog_page_handler))
        .route("/search", post(search_handler))
        .route("/instantiate", post(instantiate_handler))
        // Entities
        .route("/entities/{id}/actions/{action}", post(action_handler))
        .route("/entities/{id}/favorite", put(favorite_handler))
        .route("/cache/save", post(save_cache_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), CloudError>>, CloudError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CloudError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| CloudError::ServerError(e.to_string()))
    });

    Ok(handle)
}
