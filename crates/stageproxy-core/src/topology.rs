//! Deployment topology and the local sub-path that precedes the uploads root.

use std::str::FromStr;

/// How the installation serves its sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// One site, at the root or under a sub-path.
    #[default]
    Single,
    /// Several sites, tenant identity in the URL path (`/us/`, `/fr/`).
    MultiTenantSubpath,
    /// Several sites, tenant identity in the host name.
    MultiTenantSubdomain,
}

impl Topology {
    pub fn is_multi_tenant(&self) -> bool {
        !matches!(self, Topology::Single)
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "single" => Ok(Topology::Single),
            "subdirectory" | "subpath" => Ok(Topology::MultiTenantSubpath),
            "subdomain" => Ok(Topology::MultiTenantSubdomain),
            other => Err(format!("Unknown site topology: {}", other)),
        }
    }
}

/// Path components of the local installation as the host reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    /// Path of the public site root (`home` URL), e.g. `/` or `/us/`.
    pub home_path: String,
    /// Path the application itself is installed under (`site` URL), e.g. `/wp/`.
    pub site_path: String,
    pub topology: Topology,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            home_path: "/".to_string(),
            site_path: "/".to_string(),
            topology: Topology::Single,
        }
    }
}

/// Computes once the local path prefix that must be removed from request URIs
/// before the uploads root can be located.
#[derive(Debug, Clone)]
pub struct TopologyResolver {
    layout: SiteLayout,
    subpath_to_strip: String,
}

impl TopologyResolver {
    pub fn new(layout: SiteLayout) -> Self {
        let subpath_to_strip = compute_subpath(&layout);
        Self {
            layout,
            subpath_to_strip,
        }
    }

    /// Empty for root installs, otherwise a path like `/wp` or `/us` with no trailing slash.
    pub fn local_subpath_to_strip(&self) -> &str {
        &self.subpath_to_strip
    }

    pub fn topology(&self) -> Topology {
        self.layout.topology
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }
}

fn with_trailing_slash(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

fn compute_subpath(layout: &SiteLayout) -> String {
    let home = with_trailing_slash(&layout.home_path);

    // Application installed deeper than the public root (single site only).
    if !layout.topology.is_multi_tenant() {
        let site = with_trailing_slash(&layout.site_path);
        if site.len() > home.len() {
            return site.trim_end_matches('/').to_string();
        }
    }

    // Site root itself lives under a segment.
    if home != "/" {
        return home.trim_end_matches('/').to_string();
    }

    String::new()
}
