//! Persisted proxy settings and precedence resolution.
//!
//! Each of the three proxy settings can come from an environment constant, a
//! stored settings file, or a built-in default, in that order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::codec::extract_origin_domain;
use crate::error::AppError;

/// Settings as saved by the host's admin screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    pub sfp_url: Option<String>,
    #[serde(default)]
    pub sfp_mode: Option<String>,
    #[serde(default)]
    pub sfp_local_dir: Option<String>,
}

impl StoredSettings {
    /// Load from a JSON file. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No stored settings file");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let settings: StoredSettings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    /// Stored origin after sanitizing; invalid values are dropped with a warning.
    pub fn origin(&self) -> Option<String> {
        let raw = non_empty(self.sfp_url.as_deref())?;
        match sanitize_origin_setting(raw) {
            Some(clean) => Some(clean),
            None => {
                tracing::warn!(value = %raw, "Ignoring stored sfp_url: not a complete http(s) URL");
                None
            }
        }
    }
}

/// Validate a user-entered origin: it must be a complete http(s) URL, and is
/// then reduced to its domain (plus any site sub-path).
pub fn sanitize_origin_setting(input: &str) -> Option<String> {
    let input = input.trim();
    let parsed = Url::parse(input).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(extract_origin_domain(input))
}

/// First non-empty value wins: environment constant, then stored value.
pub fn resolve_setting(constant: Option<&str>, stored: Option<&str>) -> Option<String> {
    non_empty(constant)
        .or_else(|| non_empty(stored))
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_constant_beats_stored() {
        assert_eq!(
            resolve_setting(Some("download"), Some("local")),
            Some("download".to_string())
        );
        assert_eq!(resolve_setting(Some("  "), Some("local")), Some("local".to_string()));
        assert_eq!(resolve_setting(None, None), None);
    }

    #[test]
    fn test_sanitize_origin_setting() {
        assert_eq!(
            sanitize_origin_setting("https://prod.example.com/wp-content/uploads/"),
            Some("https://prod.example.com".to_string())
        );
        assert_eq!(sanitize_origin_setting("prod.example.com"), None);
        assert_eq!(sanitize_origin_setting("ftp://prod.example.com"), None);
    }

    #[test]
    fn test_load_settings_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sfp_url": "not a url", "sfp_mode": "local", "sfp_local_dir": "fallbacks"}}"#
        )
        .unwrap();

        let settings = StoredSettings::load(file.path()).unwrap();
        assert_eq!(settings.sfp_mode.as_deref(), Some("local"));
        assert_eq!(settings.sfp_local_dir.as_deref(), Some("fallbacks"));
        assert_eq!(settings.origin(), None);
    }

    #[test]
    fn test_missing_settings_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoredSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, StoredSettings::default());
    }
}
