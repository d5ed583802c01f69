//! Local fallback picker and the per-request decision cache.
//!
//! When the origin cannot serve a file in `local` mode, a substitute is drawn at
//! random from a pool directory. The pool listing is cached for a while, and so
//! is the pick made for each raw request URI, so reloading a page keeps showing
//! the same substitute until the decision expires.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rand::Rng;
use sha2::{Digest, Sha256};
use stageproxy_core::constants::DECISION_KEY_PREFIX;
use stageproxy_core::resize::looks_like_variant;
use stageproxy_core::AppError;
use stageproxy_storage::AssetStorage;
use thiserror::Error;

const POOL_CACHE_CAPACITY: u64 = 64;
const DECISION_CACHE_CAPACITY: u64 = 10_000;

/// Reasons a cache entry is not computed. Never stored in the cache.
#[derive(Debug, Error)]
enum PickError {
    #[error("fallback pool is empty")]
    EmptyPool,

    #[error("failed to list fallback pool: {0}")]
    Listing(String),
}

impl PickError {
    fn to_app_error(&self) -> Option<AppError> {
        match self {
            PickError::EmptyPool => None,
            PickError::Listing(message) => Some(AppError::Storage(message.clone())),
        }
    }
}

const POOL_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

fn is_pool_image(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, extension)) => {
            !stem.is_empty() && POOL_IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        }
        None => false,
    }
}

fn choose_file(files: &[String]) -> Option<String> {
    if files.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..files.len());
    files.get(index).cloned()
}

/// Picks a random eligible file from a pool directory.
#[derive(Clone)]
pub struct FallbackPicker {
    storage: Arc<dyn AssetStorage>,
    pool_cache: Cache<PathBuf, Arc<Vec<String>>>,
}

impl FallbackPicker {
    pub fn new(storage: Arc<dyn AssetStorage>, pool_ttl: Duration) -> Self {
        let pool_cache = Cache::builder()
            .max_capacity(POOL_CACHE_CAPACITY)
            .time_to_live(pool_ttl)
            .build();
        Self {
            storage,
            pool_cache,
        }
    }

    /// Eligible file names in `pool_dir`: images that are not derived size variants.
    ///
    /// Only non-empty listings are cached, so files dropped into an empty pool
    /// are picked up on the next call.
    pub async fn eligible_files(&self, pool_dir: &Path) -> Result<Arc<Vec<String>>, AppError> {
        let storage = self.storage.clone();
        let dir = pool_dir.to_path_buf();

        let listing = self
            .pool_cache
            .try_get_with(pool_dir.to_path_buf(), async move {
                let names = storage
                    .list_files(&dir)
                    .await
                    .map_err(|e| PickError::Listing(e.to_string()))?;
                let eligible: Vec<String> = names
                    .into_iter()
                    .filter(|name| is_pool_image(name) && !looks_like_variant(name))
                    .collect();
                if eligible.is_empty() {
                    return Err(PickError::EmptyPool);
                }
                tracing::debug!(
                    pool = %dir.display(),
                    files = eligible.len(),
                    "Listed fallback pool"
                );
                Ok(Arc::new(eligible))
            })
            .await;

        match listing {
            Ok(files) => Ok(files),
            Err(err) => match err.to_app_error() {
                Some(app_error) => Err(app_error),
                None => Ok(Arc::new(Vec::new())),
            },
        }
    }

    /// A uniformly random eligible file, or `None` for an empty pool.
    pub async fn pick(&self, pool_dir: &Path) -> Result<Option<PathBuf>, AppError> {
        let files = self.eligible_files(pool_dir).await?;
        Ok(choose_file(&files).map(|name| pool_dir.join(name)))
    }
}

/// Remembers which fallback file was chosen for a raw request URI.
#[derive(Clone)]
pub struct DecisionCache {
    decisions: Cache<String, PathBuf>,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        let decisions = Cache::builder()
            .max_capacity(DECISION_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { decisions }
    }

    /// `sfp_image_<sha256 hex of the raw request URI>`.
    pub fn key_for(raw_uri: &str) -> String {
        let digest = Sha256::digest(raw_uri.as_bytes());
        format!("{}{}", DECISION_KEY_PREFIX, hex::encode(digest))
    }

    pub async fn get(&self, raw_uri: &str) -> Option<PathBuf> {
        self.decisions.get(&Self::key_for(raw_uri)).await
    }

    /// Cached decision for `raw_uri`, or a fresh pick from `pool_dir`.
    ///
    /// Concurrent callers for the same URI share one pick. An empty pool is
    /// not remembered.
    pub async fn get_or_pick(
        &self,
        raw_uri: &str,
        picker: &FallbackPicker,
        pool_dir: &Path,
    ) -> Result<Option<PathBuf>, AppError> {
        let key = Self::key_for(raw_uri);
        let picker = picker.clone();
        let dir = pool_dir.to_path_buf();

        let decision = self
            .decisions
            .try_get_with(key.clone(), async move {
                match picker.pick(&dir).await {
                    Ok(Some(path)) => Ok(path),
                    Ok(None) => Err(PickError::EmptyPool),
                    Err(e) => Err(PickError::Listing(e.to_string())),
                }
            })
            .await;

        match decision {
            Ok(path) => {
                tracing::debug!(key = %key, path = %path.display(), "Fallback decision");
                Ok(Some(path))
            }
            Err(err) => match err.to_app_error() {
                Some(app_error) => Err(app_error),
                None => Ok(None),
            },
        }
    }
}

/// Pool directory, picker and decision cache bundled for the engine.
#[derive(Clone)]
pub struct LocalFallback {
    pool_dir: Option<PathBuf>,
    picker: FallbackPicker,
    decisions: DecisionCache,
}

impl LocalFallback {
    pub fn new(
        storage: Arc<dyn AssetStorage>,
        pool_dir: Option<PathBuf>,
        pool_ttl: Duration,
        decision_ttl: Duration,
    ) -> Self {
        Self {
            pool_dir,
            picker: FallbackPicker::new(storage, pool_ttl),
            decisions: DecisionCache::new(decision_ttl),
        }
    }

    pub fn pool_dir(&self) -> Option<&Path> {
        self.pool_dir.as_deref()
    }

    /// Substitute file for a failed request, `None` when there is nothing to serve.
    pub async fn resolve(&self, raw_uri: &str) -> Result<Option<PathBuf>, AppError> {
        match self.pool_dir.as_deref() {
            Some(dir) => self.decisions.get_or_pick(raw_uri, &self.picker, dir).await,
            None => Ok(None),
        }
    }
}
