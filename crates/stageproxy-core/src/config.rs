//! Configuration module
//!
//! Built once at startup from the environment (and an optional stored settings
//! file), then shared read-only.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::codec::extract_origin_domain;
use crate::constants::{
    DEFAULT_DECISION_TTL_SECS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LOCAL_FALLBACK_DIR,
    DEFAULT_PLACEHOLDER_URL, DEFAULT_POOL_TTL_SECS, DEFAULT_UPLOADS_URL_PATH,
};
use crate::mode::ProxyMode;
use crate::settings::{resolve_setting, StoredSettings};
use crate::topology::{SiteLayout, Topology};

const DEFAULT_PORT: u16 = 8080;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,

    // Proxy settings
    /// Reduced origin (`scheme://host[:port][/site-path]`), `None` when unset.
    pub remote_origin: Option<String>,
    pub mode: ProxyMode,
    pub local_fallback_dir: String,
    pub fetch_timeout_secs: u64,
    pub placeholder_url: String,

    // Local deployment
    pub uploads_base_dir: PathBuf,
    pub uploads_base_url: String,
    pub uploads_url_path: String,
    pub site_layout: SiteLayout,
    pub theme_dir: Option<PathBuf>,

    // Caches and rewriting
    pub fallback_decision_ttl_secs: u64,
    pub fallback_pool_ttl_secs: u64,
    pub synthesize_srcset: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            environment: "development".to_string(),
            remote_origin: None,
            mode: ProxyMode::default(),
            local_fallback_dir: DEFAULT_LOCAL_FALLBACK_DIR.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            uploads_base_dir: PathBuf::from("uploads"),
            uploads_base_url: format!("http://localhost:{}{}", DEFAULT_PORT, DEFAULT_UPLOADS_URL_PATH),
            uploads_url_path: DEFAULT_UPLOADS_URL_PATH.to_string(),
            site_layout: SiteLayout::default(),
            theme_dir: None,
            fallback_decision_ttl_secs: DEFAULT_DECISION_TTL_SECS,
            fallback_pool_ttl_secs: DEFAULT_POOL_TTL_SECS,
            synthesize_srcset: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let stored = match env::var("STAGE_FILE_PROXY_SETTINGS_FILE") {
            Ok(path) if !path.trim().is_empty() => StoredSettings::load(path.trim().as_ref())
                .map_err(|e| anyhow::anyhow!("Failed to load stored settings: {}", e))?,
            _ => StoredSettings::default(),
        };

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        // A constant is trusted after domain extraction, a stored value must also
        // be a complete http(s) URL.
        let remote_origin = match env::var("STAGE_FILE_PROXY_URL").ok() {
            Some(raw) if !raw.trim().is_empty() => Some(extract_origin_domain(&raw)),
            _ => stored.origin(),
        };

        let mode = match resolve_setting(
            env::var("STAGE_FILE_PROXY_MODE").ok().as_deref(),
            stored.sfp_mode.as_deref(),
        ) {
            Some(raw) => raw.parse::<ProxyMode>().map_err(|e| anyhow::anyhow!(e))?,
            None => ProxyMode::default(),
        };

        let local_fallback_dir = resolve_setting(
            env::var("STAGE_FILE_PROXY_LOCAL_DIR").ok().as_deref(),
            stored.sfp_local_dir.as_deref(),
        )
        .unwrap_or_else(|| DEFAULT_LOCAL_FALLBACK_DIR.to_string());

        let topology = env::var("SITE_TOPOLOGY")
            .unwrap_or_default()
            .parse::<Topology>()
            .map_err(|e| anyhow::anyhow!(e))?;

        let site_layout = SiteLayout {
            home_path: env::var("HOME_URL_PATH").unwrap_or_else(|_| "/".to_string()),
            site_path: env::var("SITE_URL_PATH").unwrap_or_else(|_| "/".to_string()),
            topology,
        };

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_PORT),
            environment,
            remote_origin,
            mode,
            local_fallback_dir,
            fetch_timeout_secs: env::var("STAGE_FILE_PROXY_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            placeholder_url: env::var("STAGE_FILE_PROXY_PLACEHOLDER_URL")
                .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_URL.to_string()),
            uploads_base_dir: PathBuf::from(env::var("UPLOADS_BASE_DIR").unwrap_or_default()),
            uploads_base_url: env::var("UPLOADS_BASE_URL").unwrap_or_default(),
            uploads_url_path: env::var("UPLOADS_URL_PATH")
                .unwrap_or_else(|_| DEFAULT_UPLOADS_URL_PATH.to_string()),
            site_layout,
            theme_dir: env::var("THEME_DIR").ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            fallback_decision_ttl_secs: env::var("FALLBACK_DECISION_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_DECISION_TTL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_DECISION_TTL_SECS),
            fallback_pool_ttl_secs: env::var("FALLBACK_POOL_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_POOL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_POOL_TTL_SECS),
            synthesize_srcset: env::var("SYNTHESIZE_SRCSET")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.uploads_base_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOADS_BASE_DIR must be set"));
        }

        if self.uploads_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("UPLOADS_BASE_URL must be set"));
        }
        Url::parse(&self.uploads_base_url)
            .map_err(|e| anyhow::anyhow!("UPLOADS_BASE_URL must be an absolute URL: {}", e))?;

        if self.fetch_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "STAGE_FILE_PROXY_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.mode == ProxyMode::LocalFallback && self.theme_dir.is_none() {
            return Err(anyhow::anyhow!(
                "THEME_DIR must be set when STAGE_FILE_PROXY_MODE is 'local'"
            ));
        }

        // Missing origin only fails the requests that need it.
        if self.remote_origin.is_none() && self.mode.requires_origin() {
            tracing::warn!(
                mode = %self.mode,
                "No remote origin configured; missing files will fail until STAGE_FILE_PROXY_URL is set"
            );
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Directory holding substitute images for the local fallback mode.
    pub fn fallback_pool_dir(&self) -> Option<PathBuf> {
        self.theme_dir
            .as_ref()
            .map(|theme| theme.join(&self.local_fallback_dir))
    }
}
