//! Resize-variant file name grammar: `<basename>[-r]-<width>x<height>[c].<ext>`.

use crate::asset_key::AssetKey;

const RESIZABLE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// A request for a derived size of an original image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeDescriptor {
    /// Path of the original without its extension, e.g. `2024/05/a`.
    pub basename: String,
    /// Extension as written in the request (case kept).
    pub extension: String,
    pub width: u32,
    pub height: u32,
    /// Center-crop to exactly `width`x`height`.
    pub crop: bool,
    /// The `-r` marker used for variants this proxy itself advertises.
    pub retina: bool,
}

impl ResizeDescriptor {
    /// Key of the un-suffixed original, e.g. `2024/05/a.jpg`.
    pub fn original_key(&self) -> AssetKey {
        AssetKey::new(&format!("{}.{}", self.basename, self.extension))
    }

    /// `[r-]<w>x<h>[c]`, the part appended to the original file stem.
    pub fn suffix(&self) -> String {
        let mut suffix = format!("{}x{}", self.width, self.height);
        if self.crop {
            suffix.push('c');
        }
        if self.retina {
            suffix = format!("r-{}", suffix);
        }
        suffix
    }

    /// File name of this variant when derived from a file with the given stem and extension.
    pub fn variant_file_name(&self, stem: &str, extension: &str) -> String {
        format!("{}-{}.{}", stem, self.suffix(), extension)
    }
}

/// What an asset key asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedAsset {
    Original(AssetKey),
    Resized(ResizeDescriptor),
}

impl RequestedAsset {
    pub fn parse(key: &AssetKey) -> Self {
        match resize_descriptor_from_key(key) {
            Some(descriptor) => RequestedAsset::Resized(descriptor),
            None => RequestedAsset::Original(key.clone()),
        }
    }

    /// Key that has to exist locally before this request can be answered.
    pub fn source_key(&self) -> AssetKey {
        match self {
            RequestedAsset::Original(key) => key.clone(),
            RequestedAsset::Resized(descriptor) => descriptor.original_key(),
        }
    }
}

/// Parse the resize suffix of a key. Case-insensitive; the basename is the
/// shortest prefix that lets the rest of the grammar match.
pub fn resize_descriptor_from_key(key: &AssetKey) -> Option<ResizeDescriptor> {
    let (stem, extension) = key.as_str().rsplit_once('.')?;
    if !RESIZABLE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return None;
    }

    let (stem, crop) = match stem.strip_suffix(['c', 'C']) {
        Some(rest) if rest.ends_with(|c: char| c.is_ascii_digit()) => (rest, true),
        _ => (stem, false),
    };

    let (before, dims) = stem.rsplit_once('-')?;
    let (width, height) = dims.split_once(['x', 'X'])?;
    let width = parse_dimension(width)?;
    let height = parse_dimension(height)?;

    let (basename, retina) = match before.strip_suffix("-r").or_else(|| before.strip_suffix("-R")) {
        Some(rest) if !rest.is_empty() => (rest, true),
        _ => (before, false),
    };
    if basename.is_empty() {
        return None;
    }

    Some(ResizeDescriptor {
        basename: basename.to_string(),
        extension: extension.to_string(),
        width,
        height,
        crop,
        retina,
    })
}

fn parse_dimension(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// True for file names that already look like a derived size (`…123x456[c].jpg`).
pub fn looks_like_variant(file_name: &str) -> bool {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some(parts) => parts,
        None => return false,
    };
    if !RESIZABLE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return false;
    }
    let stem = stem.strip_suffix(['c', 'C']).unwrap_or(stem);
    let (prefix, height) = match stem.rsplit_once(['x', 'X']) {
        Some(parts) => parts,
        None => return false,
    };
    if height.is_empty() || !height.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits = prefix.bytes().rev().take_while(u8::is_ascii_digit).count();
    digits > 0 && prefix.len() >= 2
}
