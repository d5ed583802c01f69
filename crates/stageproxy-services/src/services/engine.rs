//! Resolution engine: turns a request for a missing asset into a redirect or a
//! locally materialised file.
//!
//! A request walks an explicit sequence of [`Step`]s. The only loop back is the
//! re-dispatch after a fetched original has been persisted for a pending resize,
//! and that loop is bounded by [`MAX_REENTRIES`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stageproxy_core::constants::{DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_WIDTH};
use stageproxy_core::{AppError, AssetKey, Config, PathCodec, ProxyMode, RequestedAsset, ResizeDescriptor};
use stageproxy_processing::{EditorError, ImageEditor};
use stageproxy_storage::{AssetStorage, StoredFile};

use crate::services::fallback::LocalFallback;
use crate::services::fetcher::RemoteFetcher;

/// Automatic re-dispatches allowed per request.
pub const MAX_REENTRIES: u8 = 1;

/// Terminal outcome of a resolved request.
#[derive(Debug, Clone)]
pub enum Resolution {
    Redirect { location: String },
    Serve(StoredFile),
}

#[derive(Debug)]
enum Step {
    Dispatch,
    ResizeExisting {
        source: PathBuf,
        descriptor: ResizeDescriptor,
    },
    Fetch {
        key: AssetKey,
        pending: Option<ResizeDescriptor>,
    },
    Degrade {
        pending: Option<ResizeDescriptor>,
        reason: String,
    },
    Serve(PathBuf),
    Done(Resolution),
}

fn editor_error(err: EditorError) -> AppError {
    match err {
        EditorError::Decode { .. } | EditorError::Encode(_) => AppError::ImageProcessing(err.to_string()),
        EditorError::NotFound(_) | EditorError::Io(_) => AppError::Storage(err.to_string()),
        EditorError::Task(_) => AppError::Internal(err.to_string()),
    }
}

fn with_query(url: &str, params: &[(&str, String)]) -> String {
    let mut out = url.to_string();
    for (name, value) in params {
        out.push(if out.contains('?') { '&' } else { '?' });
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out
}

pub struct ResolutionEngine {
    mode: ProxyMode,
    codec: Arc<PathCodec>,
    storage: Arc<dyn AssetStorage>,
    fetcher: Arc<dyn RemoteFetcher>,
    editor: Arc<dyn ImageEditor>,
    fallback: LocalFallback,
    fetch_timeout: Duration,
    placeholder_url: String,
}

impl ResolutionEngine {
    pub fn new(
        config: &Config,
        codec: Arc<PathCodec>,
        storage: Arc<dyn AssetStorage>,
        fetcher: Arc<dyn RemoteFetcher>,
        editor: Arc<dyn ImageEditor>,
    ) -> Self {
        let fallback = LocalFallback::new(
            storage.clone(),
            config.fallback_pool_dir(),
            Duration::from_secs(config.fallback_pool_ttl_secs),
            Duration::from_secs(config.fallback_decision_ttl_secs),
        );

        Self {
            mode: config.mode,
            codec,
            storage,
            fetcher,
            editor,
            fallback,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            placeholder_url: config.placeholder_url.trim_end_matches('/').to_string(),
        }
    }

    /// Override the timeout applied to the remote fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    /// Resolve the raw request URI of a missing asset.
    #[tracing::instrument(skip(self), fields(mode = %self.mode))]
    pub async fn resolve(&self, raw_uri: &str) -> Result<Resolution, AppError> {
        let key = self.codec.relative_key_from_request(raw_uri);
        if key.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "No asset path in request: {}",
                raw_uri
            )));
        }
        if key.has_traversal() {
            return Err(AppError::InvalidInput(format!(
                "Asset path escapes the uploads directory: {}",
                key
            )));
        }

        let mut dispatches: u8 = 0;
        // Original already persisted by this request; never fetched twice.
        let mut materialised: Option<AssetKey> = None;
        let mut step = Step::Dispatch;
        loop {
            step = match step {
                Step::Dispatch => {
                    if dispatches > MAX_REENTRIES {
                        return Err(self.reentry_limit(&key, dispatches));
                    }
                    dispatches += 1;
                    self.dispatch(&key).await?
                }
                Step::ResizeExisting { source, descriptor } => {
                    self.resize_existing(&source, &descriptor).await?
                }
                Step::Fetch { key: fetch_key, pending } => {
                    if materialised.as_ref() == Some(&fetch_key) {
                        return Err(self.reentry_limit(&key, dispatches));
                    }
                    let next = self.fetch(&fetch_key, pending).await?;
                    if matches!(next, Step::Dispatch) {
                        materialised = Some(fetch_key);
                    }
                    next
                }
                Step::Degrade { pending, reason } => self.degrade(raw_uri, pending, &reason).await?,
                Step::Serve(path) => Step::Done(Resolution::Serve(self.read(&path).await?)),
                Step::Done(resolution) => return Ok(resolution),
            };
        }
    }

    fn reentry_limit(&self, key: &AssetKey, attempts: u8) -> AppError {
        tracing::error!(key = %key, attempts = attempts, "Resolution did not converge");
        AppError::ReentryLimit {
            key: key.to_string(),
            attempts,
        }
    }

    fn remote_url(&self, key: &AssetKey) -> Result<String, AppError> {
        self.codec.remote_url_from_key(key).ok_or_else(|| {
            AppError::Configuration(format!("No remote origin configured for mode {}", self.mode))
        })
    }

    async fn dispatch(&self, key: &AssetKey) -> Result<Step, AppError> {
        if self.mode.requires_origin() && self.codec.origin().is_none() {
            return Err(AppError::Configuration(format!(
                "No remote origin configured for mode {}",
                self.mode
            )));
        }

        if self.mode == ProxyMode::Redirect {
            let location = self.remote_url(key)?;
            tracing::info!(key = %key, location = %location, "Redirecting to remote origin");
            return Ok(Step::Done(Resolution::Redirect { location }));
        }

        match RequestedAsset::parse(key) {
            RequestedAsset::Resized(descriptor) => {
                let original = descriptor.original_key();

                if self.mode == ProxyMode::Photon {
                    let mut params = vec![
                        ("w", descriptor.width.to_string()),
                        ("h", descriptor.height.to_string()),
                    ];
                    if descriptor.crop {
                        params.push(("resize", format!("{},{}", descriptor.width, descriptor.height)));
                    }
                    let location = with_query(&self.remote_url(&original)?, &params);
                    tracing::info!(key = %key, location = %location, "Redirecting resize to transform service");
                    return Ok(Step::Done(Resolution::Redirect { location }));
                }

                let source = self.codec.local_path_for_key(&original);
                if self.storage.exists(&source).await {
                    Ok(Step::ResizeExisting { source, descriptor })
                } else {
                    tracing::debug!(key = %key, original = %original, "Original missing locally, fetching it first");
                    Ok(Step::Fetch {
                        key: original,
                        pending: Some(descriptor),
                    })
                }
            }
            RequestedAsset::Original(original) => {
                if self.mode == ProxyMode::Photon {
                    let location = self.remote_url(&original)?;
                    return Ok(Step::Done(Resolution::Redirect { location }));
                }

                let path = self.codec.local_path_for_key(&original);
                if self.storage.exists(&path).await {
                    Ok(Step::Serve(path))
                } else {
                    Ok(Step::Fetch {
                        key: original,
                        pending: None,
                    })
                }
            }
        }
    }

    async fn fetch(&self, key: &AssetKey, pending: Option<ResizeDescriptor>) -> Result<Step, AppError> {
        let url = match self.codec.remote_url_from_key(key) {
            Some(url) => url,
            None => {
                return Ok(Step::Degrade {
                    pending,
                    reason: "no remote origin configured".to_string(),
                })
            }
        };

        let asset = match self.fetcher.get(&url, self.fetch_timeout).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!(key = %key, url = %url, error = %e, "Remote fetch failed");
                return Ok(Step::Degrade {
                    pending,
                    reason: e.to_string(),
                });
            }
        };

        let path = self
            .storage
            .write_bits(key.parent(), key.file_name(), &asset.body)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to persist {}: {}", key, e)))?;

        match pending {
            Some(_) => Ok(Step::Dispatch),
            None => Ok(Step::Serve(path)),
        }
    }

    async fn degrade(
        &self,
        raw_uri: &str,
        pending: Option<ResizeDescriptor>,
        reason: &str,
    ) -> Result<Step, AppError> {
        match self.mode {
            ProxyMode::LocalFallback => {
                let fallback = self.fallback.resolve(raw_uri).await?.ok_or_else(|| {
                    AppError::Configuration(match self.fallback.pool_dir() {
                        Some(dir) => format!("No fallback images in {}", dir.display()),
                        None => "No fallback image directory configured".to_string(),
                    })
                })?;
                tracing::info!(path = %fallback.display(), reason = %reason, "Serving local fallback");
                Ok(match pending {
                    Some(descriptor) => Step::ResizeExisting {
                        source: fallback,
                        descriptor,
                    },
                    None => Step::Serve(fallback),
                })
            }
            ProxyMode::Placeholder => {
                let (width, height) = match pending {
                    Some(descriptor) => (descriptor.width, descriptor.height),
                    None => (0, 0),
                };
                let width = if width == 0 { DEFAULT_PLACEHOLDER_WIDTH } else { width };
                let height = if height == 0 { DEFAULT_PLACEHOLDER_HEIGHT } else { height };
                let location = format!("{}/{}/{}", self.placeholder_url, width, height);
                tracing::info!(location = %location, reason = %reason, "Redirecting to placeholder");
                Ok(Step::Done(Resolution::Redirect { location }))
            }
            _ => Err(AppError::RemoteUnavailable(reason.to_string())),
        }
    }

    async fn resize_existing(&self, source: &Path, descriptor: &ResizeDescriptor) -> Result<Step, AppError> {
        let path = self
            .editor
            .resize_to_variant(source, descriptor)
            .await
            .map_err(editor_error)?;
        Ok(Step::Serve(path))
    }

    async fn read(&self, path: &Path) -> Result<StoredFile, AppError> {
        self.storage
            .read(path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}
