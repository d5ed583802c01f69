//! Application state shared by all handlers.

use std::sync::Arc;

use stageproxy_core::{Config, PathCodec};
use stageproxy_services::{AssetStorage, AttachmentRewriter, ContentRewriter, ResolutionEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: Arc<PathCodec>,
    pub storage: Arc<dyn AssetStorage>,
    pub engine: Arc<ResolutionEngine>,
    pub rewriter: Arc<ContentRewriter>,
    pub attachments: Arc<AttachmentRewriter>,
}
