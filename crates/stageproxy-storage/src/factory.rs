use crate::{AssetStorage, LocalStorage, StorageError, StorageResult};
use stageproxy_core::Config;
use std::sync::Arc;

/// Create the asset storage for the configured uploads tree
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn AssetStorage>> {
    if config.uploads_base_dir.as_os_str().is_empty() {
        return Err(StorageError::ConfigError(
            "UPLOADS_BASE_DIR not configured".to_string(),
        ));
    }
    if config.uploads_base_url.trim().is_empty() {
        return Err(StorageError::ConfigError(
            "UPLOADS_BASE_URL not configured".to_string(),
        ));
    }

    let storage = LocalStorage::new(
        config.uploads_base_dir.clone(),
        config.uploads_base_url.clone(),
    )
    .await?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_storage_from_config() {
        let dir = tempdir().unwrap();
        let config = Config {
            uploads_base_dir: dir.path().join("uploads"),
            uploads_base_url: "http://local.test/wp-content/uploads/".to_string(),
            ..Config::default()
        };

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.base_url(), "http://local.test/wp-content/uploads");
        assert!(storage.base_dir().is_dir());
    }

    #[tokio::test]
    async fn test_create_storage_requires_base_dir() {
        let config = Config {
            uploads_base_dir: Default::default(),
            ..Config::default()
        };
        assert!(matches!(
            create_storage(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }
}
