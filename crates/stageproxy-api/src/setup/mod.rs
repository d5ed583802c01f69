//! Application setup and initialization
//!
//! Everything `main` needs to go from a [`Config`] to a running router, split
//! out so integration tests can build the same state and routes.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use stageproxy_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Validate configuration - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    tracing::info!(
        mode = %config.mode,
        origin = config.remote_origin.as_deref().unwrap_or("<unset>"),
        uploads_dir = %config.uploads_base_dir.display(),
        "Configuration loaded and validated successfully"
    );

    let state = services::initialize_services(&config).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
