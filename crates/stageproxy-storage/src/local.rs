use crate::keys::{temp_file_name, validate_bucket, validate_file_name};
use crate::traits::{AssetStorage, StorageError, StorageResult, StoredFile};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Uploads directory (e.g., "/var/www/html/wp-content/uploads")
    /// * `base_url` - Public URL of that directory (e.g., "http://local.test/wp-content/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create uploads directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        let bucket = bucket.trim_matches('/');
        if bucket.is_empty() {
            Ok(self.base_path.clone())
        } else {
            Ok(self.base_path.join(bucket))
        }
    }
}

/// Sniff the MIME type from the file's magic bytes.
pub fn detect_content_type(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

#[async_trait]
impl AssetStorage for LocalStorage {
    fn base_dir(&self) -> &Path {
        &self.base_path
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn write_bits(&self, bucket: &str, name: &str, data: &[u8]) -> StorageResult<PathBuf> {
        validate_file_name(name)?;
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir).await?;

        let path = dir.join(name);
        let temp_path = dir.join(temp_file_name(name));
        let start = std::time::Instant::now();

        let write_result = async {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(data).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to write file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to sync file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            fs::rename(&temp_path, &path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to move {} into place: {}",
                    path.display(),
                    e
                ))
            })
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            tracing::error!(path = %path.display(), error = %e, "Local storage write failed");
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            bucket = %bucket,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(path)
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> StorageResult<StoredFile> {
        let start = std::time::Instant::now();

        if !self.exists(path).await {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let data = fs::read(path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let content_type = detect_content_type(&data);
        let size = data.len() as u64;

        tracing::debug!(
            path = %path.display(),
            size_bytes = size,
            content_type = %content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(StoredFile {
            path: path.to_path_buf(),
            bytes: Bytes::from(data),
            size,
            content_type,
        })
    }

    async fn list_files(&self, dir: &Path) -> StorageResult<Vec<String>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names)
    }
}
