//! File-level image editor used by the resolution engine.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stageproxy_core::ResizeDescriptor;
use thiserror::Error;
use tokio::fs;

use crate::image::transformer::ImageTransformer;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Source image not found: {0}")]
    NotFound(String),

    /// The file exists but is not a readable image.
    #[error("Failed to decode image {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image task failed: {0}")]
    Task(String),
}

/// Open, resize and save images on local disk.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Write the variant described by `descriptor` next to `source` and return its path.
    ///
    /// The variant is named after the source file (`<stem>-<suffix>.<ext>`), which
    /// for a regular original is exactly the requested key.
    async fn resize_to_variant(
        &self,
        source: &Path,
        descriptor: &ResizeDescriptor,
    ) -> Result<PathBuf, EditorError>;
}

/// [`ImageEditor`] backed by the `image` crate. Decoding and encoding run on
/// the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct LocalImageEditor;

impl LocalImageEditor {
    pub fn new() -> Self {
        Self
    }

    fn variant_path(source: &Path, descriptor: &ResizeDescriptor) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| descriptor.extension.clone());
        let name = descriptor.variant_file_name(&stem, &extension);
        match source.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

#[async_trait]
impl ImageEditor for LocalImageEditor {
    async fn resize_to_variant(
        &self,
        source: &Path,
        descriptor: &ResizeDescriptor,
    ) -> Result<PathBuf, EditorError> {
        let start = std::time::Instant::now();
        let data = match fs::read(source).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EditorError::NotFound(source.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let target = Self::variant_path(source, descriptor);
        let extension = target
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (width, height, crop) = (descriptor.width, descriptor.height, descriptor.crop);
        let source_display = source.display().to_string();

        let encoded = tokio::task::spawn_blocking(move || {
            let img = ImageTransformer::decode(&data).map_err(|e| EditorError::Decode {
                path: source_display,
                message: e.to_string(),
            })?;
            let format = ImageTransformer::format_for_extension(&extension, &data);
            ImageTransformer::resize_decoded(img, width, height, crop, format)
                .map_err(|e| EditorError::Encode(e.to_string()))
        })
        .await
        .map_err(|e| EditorError::Task(e.to_string()))??;

        let file_name = target
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = target.with_file_name(format!(".{}.{}.part", file_name, uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&temp, &encoded).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::info!(
            source = %source.display(),
            path = %target.display(),
            width,
            height,
            crop,
            size_bytes = encoded.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Resized variant saved"
        );

        Ok(target)
    }
}
