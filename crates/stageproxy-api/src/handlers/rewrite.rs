//! Content and attachment rewriting endpoints.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use stageproxy_services::{AttachmentMetadata, ImageSrc, RenderContext, SrcsetSource};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RewriteContentRequest {
    pub content: String,
    #[serde(default)]
    pub context: RenderContext,
    /// Block name when `content` is a single rendered block.
    pub block: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RewriteContentResponse {
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UrlPayload {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageSrcRequest {
    #[serde(flatten)]
    pub src: ImageSrc,
    pub metadata: Option<AttachmentMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct SrcsetRequest {
    #[serde(default)]
    pub sources: BTreeMap<u32, SrcsetSource>,
    pub image_src: String,
    pub metadata: Option<AttachmentMetadata>,
}

#[derive(Debug, Serialize)]
pub struct SrcsetResponse {
    pub sources: BTreeMap<u32, SrcsetSource>,
}

#[tracing::instrument(skip(state, request), fields(operation = "rewrite_content", context = ?request.context))]
pub async fn rewrite_content(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RewriteContentRequest>,
) -> Result<Json<RewriteContentResponse>, HttpAppError> {
    let content = match request.block.as_deref() {
        Some(block) => state.rewriter.rewrite_block(&request.content, block).await,
        None => state.rewriter.rewrite(&request.content, request.context).await,
    };
    Ok(Json(RewriteContentResponse { content }))
}

#[tracing::instrument(skip(state), fields(operation = "rewrite_attachment_url"))]
pub async fn rewrite_attachment_url(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<UrlPayload>,
) -> Result<Json<UrlPayload>, HttpAppError> {
    let url = state.attachments.rewrite_attachment_url(&payload.url).await;
    Ok(Json(UrlPayload { url }))
}

#[tracing::instrument(skip(state), fields(operation = "rewrite_image_src"))]
pub async fn rewrite_image_src(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ImageSrcRequest>,
) -> Result<Json<ImageSrc>, HttpAppError> {
    let src = state
        .attachments
        .image_src(request.src, request.metadata.as_ref())
        .await;
    Ok(Json(src))
}

#[tracing::instrument(skip(state, request), fields(operation = "remote_srcset", image_src = %request.image_src))]
pub async fn remote_srcset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SrcsetRequest>,
) -> Result<Json<SrcsetResponse>, HttpAppError> {
    let sources = state
        .attachments
        .remote_srcset(
            request.sources,
            &request.image_src,
            request.metadata.as_ref(),
        )
        .await;
    Ok(Json(SrcsetResponse { sources }))
}
