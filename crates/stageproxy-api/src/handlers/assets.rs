//! Uploads request handling.
//!
//! Stands in for the host's static file server: a materialised file is served
//! straight from disk, anything else goes through the resolution engine.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use stageproxy_core::AppError;
use stageproxy_services::{Resolution, StoredFile};
use std::sync::Arc;
use std::time::Instant;

#[tracing::instrument(skip(state), fields(operation = "serve_asset"))]
pub async fn serve_asset(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, HttpAppError> {
    let raw_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    if !is_upload_request(uri.path(), state.codec.uploads_url_path()) {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Not found", "NOT_FOUND")),
        )
            .into_response());
    }

    if method != Method::GET && method != Method::HEAD {
        return Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
            Json(ErrorResponse::new("Method not allowed", "METHOD_NOT_ALLOWED")),
        )
            .into_response());
    }

    let started = Instant::now();
    let head_only = method == Method::HEAD;

    let key = state.codec.relative_key_from_request(raw_uri);
    if !key.is_empty() && !key.has_traversal() {
        let path = state.codec.local_path_for_key(&key);
        if state.storage.exists(&path).await {
            let file = state
                .storage
                .read(&path)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
            tracing::debug!(key = %key, path = %path.display(), "Serving materialised file");
            return file_response(file, head_only);
        }
    }

    let resolution = state.engine.resolve(raw_uri).await?;
    let duration_ms = started.elapsed().as_millis() as u64;

    match resolution {
        Resolution::Redirect { location } => {
            tracing::info!(key = %key, location = %location, duration_ms, "Redirecting to origin");
            Response::builder()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, location)
                .body(Body::empty())
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to build response");
                    AppError::Internal(e.to_string()).into()
                })
        }
        Resolution::Serve(file) => {
            tracing::info!(
                key = %key,
                path = %file.path.display(),
                size = file.size,
                duration_ms,
                "Serving resolved file"
            );
            file_response(file, head_only)
        }
    }
}

fn is_upload_request(path: &str, uploads_url_path: &str) -> bool {
    path.to_ascii_lowercase()
        .contains(&uploads_url_path.to_ascii_lowercase())
}

fn file_response(file: StoredFile, head_only: bool) -> Result<Response, HttpAppError> {
    let body = if head_only {
        Body::empty()
    } else {
        Body::from(file.bytes)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_LENGTH, file.size)
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string()).into()
        })
}
