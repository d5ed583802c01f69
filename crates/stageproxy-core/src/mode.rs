//! Proxy operating modes.

use std::fmt;
use std::str::FromStr;

/// How a missing asset is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Send a `Location` header to the remote file. Nothing is cached.
    #[default]
    Redirect,
    /// Fetch the file from the remote origin and persist it locally.
    Download,
    /// Redirect resize requests to an image transform service on the origin.
    Photon,
    /// Like `Download`, but serve a file from the local pool when the origin fails.
    LocalFallback,
    /// Like `Download`, but redirect to a placeholder host when the origin fails.
    Placeholder,
}

impl ProxyMode {
    /// Modes that can work without a remote origin.
    pub fn requires_origin(&self) -> bool {
        !matches!(self, ProxyMode::LocalFallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Redirect => "header",
            ProxyMode::Download => "download",
            ProxyMode::Photon => "photon",
            ProxyMode::LocalFallback => "local",
            ProxyMode::Placeholder => "lorempixel",
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "header" | "redirect" => Ok(ProxyMode::Redirect),
            "download" => Ok(ProxyMode::Download),
            "photon" => Ok(ProxyMode::Photon),
            "local" => Ok(ProxyMode::LocalFallback),
            "lorempixel" | "placeholder" => Ok(ProxyMode::Placeholder),
            other => Err(format!("Unknown proxy mode: {}", other)),
        }
    }
}
