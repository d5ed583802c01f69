//! Attachment metadata endpoints.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use stageproxy_services::AttachmentMetadata;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RemoteMetadataRequest {
    pub url: String,
    pub metadata: Option<AttachmentMetadata>,
}

#[derive(Debug, Serialize)]
pub struct RemoteMetadataResponse {
    /// `null` when the origin has no image at that URL.
    pub metadata: Option<AttachmentMetadata>,
}

/// Fill in the `sizes` table of an attachment from the registered image sizes.
#[tracing::instrument(skip(state, meta), fields(operation = "synthesize_sizes", file = %meta.file))]
pub async fn synthesize_sizes(
    State(state): State<Arc<AppState>>,
    ValidatedJson(meta): ValidatedJson<AttachmentMetadata>,
) -> Result<Json<AttachmentMetadata>, HttpAppError> {
    Ok(Json(state.attachments.synthesize_sizes(meta)))
}

#[tracing::instrument(skip(state, request), fields(operation = "remote_metadata", url = %request.url))]
pub async fn remote_metadata(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RemoteMetadataRequest>,
) -> Result<Json<RemoteMetadataResponse>, HttpAppError> {
    let metadata = state
        .attachments
        .remote_metadata(&request.url, request.metadata)
        .await?;
    Ok(Json(RemoteMetadataResponse { metadata }))
}
