//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p stageproxy-api`.

pub mod fixtures;

use axum_test::TestServer;
use stageproxy_api::setup::{routes, services};
use stageproxy_api::state::AppState;
use stageproxy_core::{Config, ProxyMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Local uploads URL used by every test app.
pub const LOCAL_BASE_URL: &str = "http://localhost/wp-content/uploads";

/// Test application: server, state and the temp dirs backing it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _uploads: TempDir,
    pub theme: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn uploads_dir(&self) -> &Path {
        self.state.storage.base_dir()
    }

    /// Fallback pool directory inside the theme.
    pub fn pool_dir(&self) -> PathBuf {
        self.theme.path().join(&self.state.config.local_fallback_dir)
    }

    /// Put a file into the uploads tree as if it had been uploaded locally.
    pub fn put_upload(&self, relative: &str, bytes: &[u8]) {
        let path = self.uploads_dir().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }
}

/// Setup a test app in `mode`, talking to `origin` when given.
pub async fn setup_test_app(mode: ProxyMode, origin: Option<String>) -> TestApp {
    setup_test_app_with(mode, origin, |_| {}).await
}

/// Like [`setup_test_app`], with a hook to adjust the config (the theme dir
/// is already created and set).
pub async fn setup_test_app_with(
    mode: ProxyMode,
    origin: Option<String>,
    adjust: impl FnOnce(&mut Config),
) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let theme = TempDir::new().unwrap();

    let mut config = Config {
        mode,
        remote_origin: origin,
        uploads_base_dir: uploads.path().to_path_buf(),
        uploads_base_url: LOCAL_BASE_URL.to_string(),
        theme_dir: Some(theme.path().to_path_buf()),
        fetch_timeout_secs: 5,
        ..Config::default()
    };
    adjust(&mut config);
    config.validate().unwrap();

    let state = services::initialize_services(&config).await.unwrap();
    let router = routes::setup_routes(&config, state.clone()).unwrap();
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _uploads: uploads,
        theme,
    }
}
