use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub mode: String,
    pub origin_configured: bool,
    pub storage: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        mode: state.config.mode.to_string(),
        origin_configured: state.codec.origin().is_some(),
        storage: "unknown".to_string(),
    };

    let base_dir = state.storage.base_dir();
    match tokio::time::timeout(TIMEOUT, tokio::fs::metadata(base_dir)).await {
        Ok(Ok(meta)) if meta.is_dir() => {
            response.storage = "healthy".to_string();
        }
        Ok(_) => {
            tracing::warn!(path = %base_dir.display(), "Uploads directory missing");
            response.storage = "missing".to_string();
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            response.storage = "timeout".to_string();
        }
    }

    // A mode that needs an origin but has none can only degrade.
    let healthy = !state.config.mode.requires_origin() || response.origin_configured;
    if !healthy {
        response.status = "degraded".to_string();
    }

    (StatusCode::OK, Json(response))
}
