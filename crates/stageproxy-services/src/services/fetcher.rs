//! Remote origin fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use stageproxy_core::constants::REMOTE_ERROR_STATUS;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The origin answered with an error status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// GET `url`. Statuses at or above 400 are reported as [`FetchError::Status`].
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedAsset, FetchError>;

    /// HEAD `url` and return its `content-type`, if any.
    async fn head(&self, url: &str, timeout: Duration) -> Result<Option<String>, FetchError>;
}

/// [`RemoteFetcher`] over reqwest. No retries: one attempt per call.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stageproxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn content_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
        headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedAsset, FetchError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status >= REMOTE_ERROR_STATUS {
            tracing::warn!(url = %url, status, "Remote origin returned an error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = Self::content_type(response.headers());
        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("Failed to read response body: {}", e),
        })?;

        tracing::info!(
            url = %url,
            status,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetched remote asset"
        );

        Ok(FetchedAsset {
            status,
            content_type,
            body,
        })
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status >= REMOTE_ERROR_STATUS {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(Self::content_type(response.headers()))
    }
}
