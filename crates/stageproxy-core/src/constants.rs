//! Naming and default values shared across crates.

/// URL path of the uploads directory in a conventional install.
pub const DEFAULT_UPLOADS_URL_PATH: &str = "/wp-content/uploads";

/// Path segment of the per-tenant uploads directory in sub-path networks (`sites/<id>`).
pub const TENANT_SEGMENT: &str = "sites";

/// Default directory name (under the theme directory) holding fallback images.
pub const DEFAULT_LOCAL_FALLBACK_DIR: &str = "sfp-images";

/// Default timeout for the remote fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Responses at or above this status count as a remote failure.
pub const REMOTE_ERROR_STATUS: u16 = 400;

pub const DEFAULT_PLACEHOLDER_URL: &str = "http://lorempixel.com";
pub const DEFAULT_PLACEHOLDER_WIDTH: u32 = 800;
pub const DEFAULT_PLACEHOLDER_HEIGHT: u32 = 600;

/// Dimensions assumed for remote originals whose real size is unknown.
pub const ASSUMED_ORIGINAL_WIDTH: u32 = 1200;
pub const ASSUMED_ORIGINAL_HEIGHT: u32 = 800;

pub const DEFAULT_DECISION_TTL_SECS: u64 = 3600;
pub const DEFAULT_POOL_TTL_SECS: u64 = 3600;

/// Prefix of the fallback decision cache key; the remainder is a hash of the raw request URI.
pub const DECISION_KEY_PREFIX: &str = "sfp_image_";

/// `sizes` attribute added to rewritten images that carry no responsive attributes.
pub const DEFAULT_SIZES_ATTR: &str = "(max-width: 768px) 100vw, (max-width: 1024px) 50vw, 33vw";

/// First path segment of the content tree; anything from here on in an origin
/// setting is an asset path, not part of the site root.
pub const CONTENT_ROOT_MARKER: &str = "/wp-content";
