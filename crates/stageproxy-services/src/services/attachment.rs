//! Attachment-level helpers: URL, image source, srcset and metadata backfill for
//! uploads that only exist on the remote origin.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stageproxy_core::constants::{ASSUMED_ORIGINAL_HEIGHT, ASSUMED_ORIGINAL_WIDTH};
use stageproxy_core::{AppError, PathCodec};
use stageproxy_processing::{
    resize_dimensions, synthesize_size_metadata, AttachmentMetadata, ImageTransformer, NamedSize,
};
use stageproxy_storage::AssetStorage;

use crate::services::fetcher::RemoteFetcher;
use crate::services::rewriter::remote_if_missing;

/// An attachment image source: URL, dimensions and whether it is a derived size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSrc {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub intermediate: bool,
}

/// One `srcset` candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcsetSource {
    pub url: String,
    pub descriptor: String,
    pub value: u32,
}

pub struct AttachmentRewriter {
    codec: Arc<PathCodec>,
    storage: Arc<dyn AssetStorage>,
    fetcher: Arc<dyn RemoteFetcher>,
    sizes: Vec<NamedSize>,
    fetch_timeout: Duration,
}

impl AttachmentRewriter {
    pub fn new(
        codec: Arc<PathCodec>,
        storage: Arc<dyn AssetStorage>,
        fetcher: Arc<dyn RemoteFetcher>,
        sizes: Vec<NamedSize>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            storage,
            fetcher,
            sizes,
            fetch_timeout,
        }
    }

    pub fn sizes(&self) -> &[NamedSize] {
        &self.sizes
    }

    /// Point an attachment URL at the origin when its local file is missing.
    pub async fn rewrite_attachment_url(&self, url: &str) -> String {
        remote_if_missing(&self.codec, self.storage.as_ref(), url)
            .await
            .unwrap_or_else(|| url.to_string())
    }

    /// Rewrite a missing image source and fill in its dimensions.
    ///
    /// Missing dimensions come from `meta`, or 1200x800 without it; either way
    /// the source is then flagged as intermediate.
    pub async fn image_src(&self, src: ImageSrc, meta: Option<&AttachmentMetadata>) -> ImageSrc {
        let url = match remote_if_missing(&self.codec, self.storage.as_ref(), &src.url).await {
            Some(url) => url,
            None => return src,
        };

        let mut out = ImageSrc { url, ..src };
        if out.width == 0 || out.height == 0 {
            let (width, height) = match meta {
                Some(meta) if meta.width > 0 && meta.height > 0 => (meta.width, meta.height),
                _ => (ASSUMED_ORIGINAL_WIDTH, ASSUMED_ORIGINAL_HEIGHT),
            };
            out.width = width;
            out.height = height;
            out.intermediate = true;
        }
        out
    }

    /// Add a candidate per registered size for an image that is missing locally.
    ///
    /// Candidates are keyed by width and replace incoming sources of the same width.
    pub async fn remote_srcset(
        &self,
        mut sources: BTreeMap<u32, SrcsetSource>,
        image_src: &str,
        meta: Option<&AttachmentMetadata>,
    ) -> BTreeMap<u32, SrcsetSource> {
        let meta = match meta {
            Some(meta) if !image_src.is_empty() => meta,
            _ => return sources,
        };
        if !self.codec.is_local_asset_url(image_src) {
            return sources;
        }
        if self.storage.exists(&self.codec.local_path_for_url(image_src)).await {
            return sources;
        }
        if meta.width == 0 || meta.height == 0 {
            return sources;
        }

        let path_end = image_src.find(['?', '#']).unwrap_or(image_src.len());
        let (dir, file_name) = match image_src[..path_end].rsplit_once('/') {
            Some(parts) => parts,
            None => return sources,
        };
        let (name, ext) = match file_name.rsplit_once('.') {
            Some(parts) => parts,
            None => return sources,
        };

        for size in &self.sizes {
            if size.width == 0 && size.height == 0 {
                continue;
            }
            let dims = match resize_dimensions(meta.width, meta.height, size.width, size.height, size.crop) {
                Some(dims) => dims,
                None => continue,
            };

            let crop_flag = if size.crop { "c" } else { "" };
            let local_url = format!("{}/{}-{}x{}{}.{}", dir, name, dims.dst_w, dims.dst_h, crop_flag, ext);
            let url = remote_if_missing(&self.codec, self.storage.as_ref(), &local_url)
                .await
                .unwrap_or(local_url);

            sources.insert(
                dims.dst_w,
                SrcsetSource {
                    url,
                    descriptor: "w".to_string(),
                    value: dims.dst_w,
                },
            );
        }

        sources
    }

    /// Size metadata for the registered sizes.
    pub fn synthesize_sizes(&self, meta: AttachmentMetadata) -> AttachmentMetadata {
        synthesize_size_metadata(meta, &self.sizes)
    }

    /// Build basic metadata for an attachment only the origin has.
    ///
    /// Existing metadata is returned unchanged. Otherwise the origin is asked
    /// for the file with a HEAD request; only `image/*` responses produce
    /// metadata, with dimensions read from the downloaded file (1200x800 when
    /// they cannot be determined).
    pub async fn remote_metadata(
        &self,
        url: &str,
        existing: Option<AttachmentMetadata>,
    ) -> Result<Option<AttachmentMetadata>, AppError> {
        if existing.is_some() {
            return Ok(existing);
        }
        let key = match self.codec.key_from_local_url(url) {
            Some(key) if !key.is_empty() => key,
            _ => return Ok(None),
        };
        if key.has_traversal() {
            return Err(AppError::InvalidInput(format!(
                "Attachment path escapes the uploads directory: {}",
                key
            )));
        }
        if self.storage.exists(&self.codec.local_path_for_key(&key)).await {
            return Ok(None);
        }
        let remote_url = match remote_if_missing(&self.codec, self.storage.as_ref(), url).await {
            Some(remote_url) => remote_url,
            None => return Ok(None),
        };

        let content_type = match self.fetcher.head(&remote_url, self.fetch_timeout).await {
            Ok(Some(content_type)) => content_type,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::debug!(url = %remote_url, error = %e, "Remote metadata probe failed");
                return Ok(None);
            }
        };
        if !content_type.starts_with("image/") {
            return Ok(None);
        }

        let dimensions = match self.fetcher.get(&remote_url, self.fetch_timeout).await {
            Ok(asset) => tokio::task::spawn_blocking(move || ImageTransformer::dimensions(&asset.body))
                .await
                .map_err(|e| AppError::Internal(format!("Dimension probe task failed: {}", e)))?,
            Err(e) => {
                tracing::warn!(url = %remote_url, error = %e, "Could not download image for dimensions");
                None
            }
        };
        let (width, height) = match dimensions {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => (ASSUMED_ORIGINAL_WIDTH, ASSUMED_ORIGINAL_HEIGHT),
        };

        tracing::info!(url = %remote_url, width, height, "Backfilled remote image metadata");

        Ok(Some(AttachmentMetadata {
            width,
            height,
            file: key.to_string(),
            sizes: BTreeMap::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetcher::HttpFetcher;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use stageproxy_core::{SiteLayout, TopologyResolver};
    use stageproxy_processing::default_image_sizes;
    use stageproxy_storage::LocalStorage;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    const LOCAL: &str = "http://local.test/wp-content/uploads";

    async fn attachments(origin: &str) -> (TempDir, AttachmentRewriter) {
        let dir = tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let storage: Arc<dyn AssetStorage> =
            Arc::new(LocalStorage::new(&uploads, LOCAL.to_string()).await.unwrap());
        let codec = Arc::new(
            PathCodec::new(
                TopologyResolver::new(SiteLayout::default()),
                "/wp-content/uploads",
                LOCAL,
                &uploads,
                Some(origin),
            )
            .unwrap(),
        );
        let rewriter = AttachmentRewriter::new(
            codec,
            storage,
            Arc::new(HttpFetcher::new().unwrap()),
            default_image_sizes(),
            Duration::from_secs(5),
        );
        (dir, rewriter)
    }

    fn meta(width: u32, height: u32) -> AttachmentMetadata {
        AttachmentMetadata {
            width,
            height,
            file: "2024/05/a.jpg".to_string(),
            sizes: BTreeMap::new(),
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_attachment_url_rewrite() {
        let (dir, rewriter) = attachments("https://prod.example.com").await;
        assert_eq!(
            rewriter.rewrite_attachment_url(&format!("{}/2024/05/a.jpg?ver=2", LOCAL)).await,
            "https://prod.example.com/wp-content/uploads/2024/05/a.jpg?ver=2"
        );

        std::fs::create_dir_all(dir.path().join("uploads/2024/05")).unwrap();
        std::fs::write(dir.path().join("uploads/2024/05/here.jpg"), b"x").unwrap();
        let present = format!("{}/2024/05/here.jpg", LOCAL);
        assert_eq!(rewriter.rewrite_attachment_url(&present).await, present);

        let foreign = "https://elsewhere.example.com/a.jpg";
        assert_eq!(rewriter.rewrite_attachment_url(foreign).await, foreign);
    }

    #[tokio::test]
    async fn test_image_src_backfills_dimensions() {
        let (_dir, rewriter) = attachments("https://prod.example.com").await;
        let src = ImageSrc {
            url: format!("{}/2024/05/a.jpg", LOCAL),
            width: 0,
            height: 0,
            intermediate: false,
        };

        let from_meta = rewriter.image_src(src.clone(), Some(&meta(2000, 1500))).await;
        assert_eq!(from_meta.url, "https://prod.example.com/wp-content/uploads/2024/05/a.jpg");
        assert_eq!((from_meta.width, from_meta.height, from_meta.intermediate), (2000, 1500, true));

        let assumed = rewriter.image_src(src, None).await;
        assert_eq!((assumed.width, assumed.height, assumed.intermediate), (1200, 800, true));
    }

    #[tokio::test]
    async fn test_image_src_with_dimensions_keeps_them() {
        let (_dir, rewriter) = attachments("https://prod.example.com").await;
        let src = ImageSrc {
            url: format!("{}/2024/05/a-300x200.jpg", LOCAL),
            width: 300,
            height: 200,
            intermediate: true,
        };
        let out = rewriter.image_src(src, None).await;
        assert_eq!(out.url, "https://prod.example.com/wp-content/uploads/2024/05/a-300x200.jpg");
        assert_eq!((out.width, out.height), (300, 200));
    }

    #[tokio::test]
    async fn test_remote_srcset_for_missing_image() {
        let (_dir, rewriter) = attachments("https://prod.example.com").await;
        let mut incoming = BTreeMap::new();
        incoming.insert(
            300,
            SrcsetSource {
                url: "stale".to_string(),
                descriptor: "w".to_string(),
                value: 300,
            },
        );
        incoming.insert(
            2000,
            SrcsetSource {
                url: format!("{}/2024/05/a.jpg", LOCAL),
                descriptor: "w".to_string(),
                value: 2000,
            },
        );

        let sources = rewriter
            .remote_srcset(
                incoming,
                &format!("{}/2024/05/a.jpg", LOCAL),
                Some(&meta(2000, 1500)),
            )
            .await;

        let remote = "https://prod.example.com/wp-content/uploads/2024/05";
        assert_eq!(sources[&150].url, format!("{}/a-150x150c.jpg", remote));
        assert_eq!(sources[&300].url, format!("{}/a-300x225.jpg", remote));
        assert_eq!(sources[&768].url, format!("{}/a-768x576.jpg", remote));
        assert_eq!(sources[&1024].url, format!("{}/a-1024x768.jpg", remote));
        assert_eq!(sources[&1024].descriptor, "w");
        assert!(sources.contains_key(&2000));
        assert_eq!(sources.len(), 5);
    }

    #[tokio::test]
    async fn test_remote_srcset_noop_without_meta_or_when_present() {
        let (dir, rewriter) = attachments("https://prod.example.com").await;
        let src = format!("{}/2024/05/a.jpg", LOCAL);
        assert!(rewriter.remote_srcset(BTreeMap::new(), &src, None).await.is_empty());

        std::fs::create_dir_all(dir.path().join("uploads/2024/05")).unwrap();
        std::fs::write(dir.path().join("uploads/2024/05/a.jpg"), b"x").unwrap();
        assert!(rewriter
            .remote_srcset(BTreeMap::new(), &src, Some(&meta(2000, 1500)))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_remote_metadata_reads_dimensions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/wp-content/uploads/2024/05/a.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .create_async()
            .await;
        server
            .mock("GET", "/wp-content/uploads/2024/05/a.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png(64, 48))
            .create_async()
            .await;

        let (_dir, rewriter) = attachments(&server.url()).await;
        let meta = rewriter
            .remote_metadata(&format!("{}/2024/05/a.png", LOCAL), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((meta.width, meta.height), (64, 48));
        assert_eq!(meta.file, "2024/05/a.png");
        assert!(meta.sizes.is_empty());
    }

    #[tokio::test]
    async fn test_remote_metadata_defaults_when_unreadable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/wp-content/uploads/2024/05/b.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .create_async()
            .await;
        server
            .mock("GET", "/wp-content/uploads/2024/05/b.jpg")
            .with_status(200)
            .with_body("garbage")
            .create_async()
            .await;

        let (_dir, rewriter) = attachments(&server.url()).await;
        let meta = rewriter
            .remote_metadata(&format!("{}/2024/05/b.jpg", LOCAL), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((meta.width, meta.height), (1200, 800));
    }

    #[tokio::test]
    async fn test_remote_metadata_ignores_non_images() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/wp-content/uploads/2024/05/doc.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;

        let (_dir, rewriter) = attachments(&server.url()).await;
        let meta = rewriter
            .remote_metadata(&format!("{}/2024/05/doc.pdf", LOCAL), None)
            .await
            .unwrap();
        assert_eq!(meta, None);
    }

    #[tokio::test]
    async fn test_remote_metadata_keeps_existing() {
        let (_dir, rewriter) = attachments("https://prod.example.com").await;
        let existing = meta(10, 10);
        let out = rewriter
            .remote_metadata(&format!("{}/2024/05/a.jpg", LOCAL), Some(existing.clone()))
            .await
            .unwrap();
        assert_eq!(out, Some(existing));
    }
}
