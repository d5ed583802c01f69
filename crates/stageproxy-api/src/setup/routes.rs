//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use stageproxy_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest rewrite request body accepted (rendered pages can be big).
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Setup all application routes
///
/// Anything that is not an explicit route falls through to the uploads
/// handler, which only answers paths under the uploads URL path.
pub fn setup_routes(_config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(rewrite_routes())
        .merge(metadata_routes())
        .fallback(handlers::assets::serve_asset)
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit()))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Server-level cap on in-flight requests (`HTTP_CONCURRENCY_LIMIT`, default 10000).
fn http_concurrency_limit() -> usize {
    let limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(http_concurrency_limit = limit, "HTTP concurrency limit layer enabled");
    limit
}

fn rewrite_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rewrite/content", post(handlers::rewrite::rewrite_content))
        .route(
            "/rewrite/attachment-url",
            post(handlers::rewrite::rewrite_attachment_url),
        )
        .route("/rewrite/image-src", post(handlers::rewrite::rewrite_image_src))
        .route("/rewrite/srcset", post(handlers::rewrite::remote_srcset))
}

fn metadata_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metadata/sizes", post(handlers::metadata::synthesize_sizes))
        .route("/metadata/remote", post(handlers::metadata::remote_metadata))
}
