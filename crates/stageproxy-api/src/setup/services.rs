//! Service construction

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use stageproxy_core::{Config, PathCodec, TopologyResolver};
use stageproxy_services::{
    create_storage, default_image_sizes, AttachmentRewriter, ContentRewriter, HttpFetcher,
    LocalImageEditor, RemoteFetcher, ResolutionEngine,
};

use crate::state::AppState;

/// Build the application state with the real HTTP fetcher.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let fetcher: Arc<dyn RemoteFetcher> =
        Arc::new(HttpFetcher::new().context("Failed to create remote fetcher")?);
    initialize_services_with_fetcher(config, fetcher).await
}

/// Build the application state around a given fetcher.
pub async fn initialize_services_with_fetcher(
    config: &Config,
    fetcher: Arc<dyn RemoteFetcher>,
) -> Result<Arc<AppState>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize uploads storage")?;

    let codec = Arc::new(
        PathCodec::new(
            TopologyResolver::new(config.site_layout.clone()),
            &config.uploads_url_path,
            &config.uploads_base_url,
            &config.uploads_base_dir,
            config.remote_origin.as_deref(),
        )
        .context("Failed to build path codec")?,
    );

    if let Some(origin) = codec.origin() {
        tracing::info!(
            origin = %origin.base(),
            asset_root = %origin.asset_root(),
            "Remote origin resolved"
        );
    }

    let engine = ResolutionEngine::new(
        config,
        codec.clone(),
        storage.clone(),
        fetcher.clone(),
        Arc::new(LocalImageEditor::new()),
    );

    let rewriter = ContentRewriter::new(codec.clone(), storage.clone(), config.synthesize_srcset)
        .context("Failed to build content rewriter")?;

    let attachments = AttachmentRewriter::new(
        codec.clone(),
        storage.clone(),
        fetcher,
        default_image_sizes(),
        Duration::from_secs(config.fetch_timeout_secs),
    );

    Ok(Arc::new(AppState {
        config: Arc::new(config.clone()),
        codec,
        storage,
        engine: Arc::new(engine),
        rewriter: Arc::new(rewriter),
        attachments: Arc::new(attachments),
    }))
}
