//! Path and URL algebra between local requests, asset keys and the remote origin.

use std::path::{Path, PathBuf};

use regex::Regex;
use url::Url;

use crate::asset_key::AssetKey;
use crate::constants::{CONTENT_ROOT_MARKER, DEFAULT_UPLOADS_URL_PATH, TENANT_SEGMENT};
use crate::error::AppError;
use crate::topology::{Topology, TopologyResolver};

/// Reduce an origin setting to `scheme://host[:port][/site-path]`.
///
/// Users often paste a full uploads URL; everything from the content root marker
/// onwards is dropped. Input that does not parse as an absolute URL is returned
/// with its trailing slashes trimmed.
pub fn extract_origin_domain(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return raw.trim_end_matches('/').to_string(),
    };
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return raw.trim_end_matches('/').to_string(),
    };

    let mut clean = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        clean.push_str(&format!(":{}", port));
    }

    let path = parsed.path();
    match path.to_ascii_lowercase().find(CONTENT_ROOT_MARKER) {
        Some(pos) => {
            let before = path[..pos].trim_end_matches('/');
            clean.push_str(before);
        }
        None => clean.push_str(path.trim_end_matches('/')),
    }

    clean
}

/// The remote side: where assets live on the production origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOrigin {
    base: String,
    asset_root: String,
}

impl RemoteOrigin {
    /// `base` is reduced with [`extract_origin_domain`]; `asset_root` is the
    /// canonical uploads path on the origin, e.g. `/wp-content/uploads/sites/7`.
    pub fn new(base: &str, asset_root: &str) -> Self {
        Self {
            base: extract_origin_domain(base),
            asset_root: format!("/{}", asset_root.trim_matches('/')),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn asset_root(&self) -> &str {
        &self.asset_root
    }

    pub fn url_for(&self, relative: &str) -> String {
        format!(
            "{}{}/{}",
            self.base.trim_end_matches('/'),
            self.asset_root,
            relative.trim_start_matches('/')
        )
    }
}

/// Canonical remote uploads path for the local deployment.
///
/// Sub-path networks keep their `sites/<id>` segment, sub-domain networks and
/// single sites use the plain uploads root.
fn canonical_asset_root(topology: Topology, local_uploads_path: &str, tenant_root: &Regex) -> String {
    if topology == Topology::MultiTenantSubpath {
        if let Some(caps) = tenant_root.captures(local_uploads_path) {
            return format!("{}/{}/{}", DEFAULT_UPLOADS_URL_PATH, TENANT_SEGMENT, &caps[1]);
        }
    }
    DEFAULT_UPLOADS_URL_PATH.to_string()
}

/// Translates between inbound request URIs, asset keys, local files and remote URLs.
#[derive(Debug, Clone)]
pub struct PathCodec {
    resolver: TopologyResolver,
    uploads_url_path: String,
    local_base_url: String,
    local_base_dir: PathBuf,
    origin: Option<RemoteOrigin>,
    uploads_marker_fallback: Regex,
    leading_tenant_segment: Regex,
}

impl PathCodec {
    /// * `uploads_url_path` - path marker of the uploads root in request URIs.
    /// * `local_base_url` - full URL of the local uploads root.
    /// * `origin_base` - reduced origin setting, `None` when not configured.
    pub fn new(
        resolver: TopologyResolver,
        uploads_url_path: &str,
        local_base_url: &str,
        local_base_dir: impl Into<PathBuf>,
        origin_base: Option<&str>,
    ) -> Result<Self, AppError> {
        let tenant_root = Regex::new(r"/wp-content/uploads/sites/(\d+)")
            .map_err(|e| AppError::Configuration(format!("tenant root pattern: {}", e)))?;
        let uploads_marker_fallback = Regex::new(r"(?i)^.*/wp-content/uploads(/sites/\d+)?/")
            .map_err(|e| AppError::Configuration(format!("uploads marker pattern: {}", e)))?;
        let leading_tenant_segment = Regex::new(r"^/sites/\d+(/|$)")
            .map_err(|e| AppError::Configuration(format!("tenant segment pattern: {}", e)))?;

        let local_base_url = local_base_url.trim_end_matches('/').to_string();
        let local_uploads_path = Url::parse(&local_base_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| local_base_url.clone());
        let asset_root =
            canonical_asset_root(resolver.topology(), &local_uploads_path, &tenant_root);
        let origin = origin_base
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(|base| RemoteOrigin::new(base, &asset_root));

        let uploads_url_path = format!("/{}", uploads_url_path.trim_matches('/'));

        Ok(Self {
            resolver,
            uploads_url_path,
            local_base_url,
            local_base_dir: local_base_dir.into(),
            origin,
            uploads_marker_fallback,
            leading_tenant_segment,
        })
    }

    pub fn origin(&self) -> Option<&RemoteOrigin> {
        self.origin.as_ref()
    }

    pub fn local_base_url(&self) -> &str {
        &self.local_base_url
    }

    pub fn local_base_dir(&self) -> &Path {
        &self.local_base_dir
    }

    pub fn uploads_url_path(&self) -> &str {
        &self.uploads_url_path
    }

    /// Asset key of an inbound request.
    ///
    /// Strips the local sub-path, the uploads root and a tenant segment, in that
    /// order. A URI without any uploads marker is returned as-is (minus the sub-path).
    pub fn relative_key_from_request(&self, raw_uri: &str) -> AssetKey {
        let mut uri = raw_uri;

        let subpath = self.resolver.local_subpath_to_strip();
        if !subpath.is_empty() {
            if let Some(rest) = uri.strip_prefix(subpath) {
                // `/wp` must not eat the front of `/wp-content`.
                if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
                    uri = rest;
                }
            }
        }

        if let Some(pos) = uri.find(&self.uploads_url_path) {
            let rest = &uri[pos + self.uploads_url_path.len()..];
            let rest = match self.leading_tenant_segment.find(rest) {
                Some(m) => &rest[m.end()..],
                None => rest,
            };
            return AssetKey::new(rest);
        }

        let stripped = self.uploads_marker_fallback.replace(uri, "");
        AssetKey::new(&stripped)
    }

    /// Remote URL of an asset, `None` without a configured origin.
    pub fn remote_url_from_key(&self, key: &AssetKey) -> Option<String> {
        self.origin.as_ref().map(|origin| origin.url_for(key.as_str()))
    }

    /// Local file that a URL under the uploads base maps to.
    pub fn local_path_for_url(&self, url: &str) -> PathBuf {
        let relative = match url.strip_prefix(&self.local_base_url) {
            Some(rest) => rest.to_string(),
            None => Url::parse(url)
                .map(|u| u.path().to_string())
                .unwrap_or_else(|_| url.to_string()),
        };
        self.local_base_dir.join(AssetKey::new(&relative).as_str())
    }

    pub fn local_path_for_key(&self, key: &AssetKey) -> PathBuf {
        self.local_base_dir.join(key.as_str())
    }

    pub fn is_local_asset_url(&self, url: &str) -> bool {
        !self.local_base_url.is_empty() && url.starts_with(&self.local_base_url)
    }

    /// Asset key of a full local URL, `None` for URLs outside the uploads base.
    pub fn key_from_local_url(&self, url: &str) -> Option<AssetKey> {
        url.strip_prefix(&self.local_base_url).map(AssetKey::new)
    }

    /// Point a local uploads URL at the origin, keeping query string and fragment.
    ///
    /// URLs outside the local uploads base, or any URL when no origin is
    /// configured, come back unchanged.
    pub fn rewrite_local_to_remote(&self, url: &str) -> String {
        let origin = match self.origin.as_ref() {
            Some(origin) => origin,
            None => return url.to_string(),
        };
        let rest = match url.strip_prefix(&self.local_base_url) {
            Some(rest) if self.is_local_asset_url(url) => rest,
            _ => return url.to_string(),
        };
        // The remainder must start a new path segment, a query or a fragment.
        if !(rest.is_empty() || rest.starts_with(['/', '?', '#'])) {
            return url.to_string();
        }

        let split = rest.find(['?', '#']).unwrap_or(rest.len());
        let (path, suffix) = rest.split_at(split);

        let mut rewritten = format!(
            "{}{}",
            origin.base().trim_end_matches('/'),
            origin.asset_root()
        );
        if !path.trim_matches('/').is_empty() {
            rewritten.push('/');
            rewritten.push_str(path.trim_start_matches('/'));
        }
        rewritten.push_str(suffix);
        rewritten
    }
}
