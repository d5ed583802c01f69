//! Attachment size metadata.
//!
//! The host never generates intermediate sizes for uploads proxied from the
//! origin. Instead the metadata advertises `-r-` variants that the resolution
//! engine produces on first request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dimensions::resize_dimensions;

/// A registered image size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSize {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub crop: bool,
}

impl NamedSize {
    pub fn new(name: &str, width: u32, height: u32, crop: bool) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            crop,
        }
    }
}

/// The host's default size table.
pub fn default_image_sizes() -> Vec<NamedSize> {
    vec![
        NamedSize::new("thumbnail", 150, 150, true),
        NamedSize::new("medium", 300, 300, false),
        NamedSize::new("medium_large", 768, 0, false),
        NamedSize::new("large", 1024, 1024, false),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Metadata of an image attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub width: u32,
    pub height: u32,
    /// Path relative to the uploads root, e.g. `2024/05/a.jpg`.
    pub file: String,
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeEntry>,
}

impl AttachmentMetadata {
    /// File name without directories and extension, plus the extension.
    pub fn name_and_extension(&self) -> (String, String) {
        let file_name = self.file.rsplit('/').next().unwrap_or(&self.file);
        match file_name.rsplit_once('.') {
            Some((name, ext)) => (name.to_string(), ext.to_string()),
            None => (file_name.to_string(), String::new()),
        }
    }
}

/// Add a `sizes` entry for every requested size the image can be shrunk to.
///
/// Entries are named `<name>-r-<w>x<h>[c].<ext>` after the real resulting
/// dimensions. Sizes that would upscale are skipped; existing entries for
/// other names are kept.
pub fn synthesize_size_metadata(
    mut meta: AttachmentMetadata,
    sizes: &[NamedSize],
) -> AttachmentMetadata {
    let (name, ext) = meta.name_and_extension();

    for size in sizes {
        let dims = match resize_dimensions(meta.width, meta.height, size.width, size.height, size.crop) {
            Some(dims) => dims,
            None => continue,
        };

        let mut suffix = format!("r-{}x{}", dims.dst_w, dims.dst_h);
        if size.crop {
            suffix.push('c');
        }
        let file = if ext.is_empty() {
            format!("{}-{}", name, suffix)
        } else {
            format!("{}-{}.{}", name, suffix, ext)
        };

        meta.sizes.insert(
            size.name.clone(),
            SizeEntry {
                file,
                width: dims.dst_w,
                height: dims.dst_h,
            },
        );
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(width: u32, height: u32) -> AttachmentMetadata {
        AttachmentMetadata {
            width,
            height,
            file: "2024/05/beach.jpg".to_string(),
            sizes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_synthesizes_default_sizes() {
        let out = synthesize_size_metadata(meta(1200, 800), &default_image_sizes());

        assert_eq!(out.sizes["thumbnail"].file, "beach-r-150x150c.jpg");
        assert_eq!(out.sizes["medium"].file, "beach-r-300x200.jpg");
        assert_eq!(out.sizes["medium_large"].file, "beach-r-768x512.jpg");
        assert_eq!(out.sizes["large"].file, "beach-r-1024x683.jpg");
        assert_eq!(out.sizes["large"].height, 683);
    }

    #[test]
    fn test_skips_upscaled_sizes() {
        let out = synthesize_size_metadata(meta(400, 300), &default_image_sizes());
        assert!(out.sizes.contains_key("thumbnail"));
        assert!(out.sizes.contains_key("medium"));
        assert!(!out.sizes.contains_key("medium_large"));
        assert!(!out.sizes.contains_key("large"));
    }

    #[test]
    fn test_deserializes_without_sizes() {
        let meta: AttachmentMetadata =
            serde_json::from_str(r#"{"width": 10, "height": 10, "file": "a.png"}"#).unwrap();
        assert!(meta.sizes.is_empty());
        assert_eq!(meta.name_and_extension(), ("a".to_string(), "png".to_string()));
    }
}
