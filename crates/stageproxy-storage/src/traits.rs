//! Storage abstraction trait
//!
//! This module defines the [`AssetStorage`] trait the resolution engine and the
//! content rewriter use to reach the local uploads tree.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A local file read in full, ready to be streamed to a client.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub bytes: Bytes,
    pub size: u64,
    pub content_type: String,
}

/// Local asset storage.
///
/// Paths handed to [`exists`](AssetStorage::exists), [`read`](AssetStorage::read)
/// and [`list_files`](AssetStorage::list_files) may point outside the uploads
/// tree (the fallback pool lives in the theme directory); writes never do.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Root directory of the uploads tree.
    fn base_dir(&self) -> &Path;

    /// Public URL of the uploads root, without trailing slash.
    fn base_url(&self) -> &str;

    /// Write `data` to `{base_dir}/{bucket}/{name}` and return the final path.
    ///
    /// The bytes go to a temporary sibling first and are renamed into place, so
    /// readers never observe a partial file. Concurrent writers of the same
    /// name race harmlessly: the last rename wins.
    async fn write_bits(&self, bucket: &str, name: &str, data: &[u8]) -> StorageResult<PathBuf>;

    /// True for an existing regular file.
    async fn exists(&self, path: &Path) -> bool;

    /// Read a whole file together with its size and MIME type.
    async fn read(&self, path: &Path) -> StorageResult<StoredFile>;

    /// Regular, non-hidden file names directly inside `dir`, sorted.
    /// A missing directory lists as empty.
    async fn list_files(&self, dir: &Path) -> StorageResult<Vec<String>>;
}
