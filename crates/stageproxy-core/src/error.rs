//! Error types module
//!
//! All failures that can end a proxied request are unified under [`AppError`].
//! Remote unavailability is normally recovered by the active proxy mode, so an
//! `AppError` reaching the HTTP layer always means a terminal failure: the
//! client gets an error response and never a partial body.

use std::io;

/// Severity an error is logged at when it reaches the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like malformed request paths
    Debug,
    /// Warning level - for degraded environments (origin down, corrupt files)
    Warn,
    /// Broken deployments and bugs
    Error,
}

/// How an error is presented to a client and to the logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CONFIGURATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Message safe to show a client.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose details or the error chain.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No remote origin while the mode needs one, or an empty fallback pool.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The origin could not serve the asset and the mode has no degradation path.
    #[error("Remote origin unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Resolution re-entered {attempts} times for {key}")]
    ReentryLimit { key: String, attempts: u8 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Configuration(_) => (500, "CONFIGURATION_ERROR", true, LogLevel::Error),
        AppError::RemoteUnavailable(_) => (502, "REMOTE_UNAVAILABLE", false, LogLevel::Warn),
        AppError::ImageProcessing(_) => (500, "IMAGE_PROCESSING_ERROR", false, LogLevel::Warn),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::ReentryLimit { .. } => (500, "REENTRY_LIMIT", false, LogLevel::Error),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Variant name, reported next to the details outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Configuration(_) => "Configuration",
            AppError::RemoteUnavailable(_) => "RemoteUnavailable",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::ReentryLimit { .. } => "ReentryLimit",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            _ => "Stage proxy could not resolve the requested file".to_string(),
        }
    }
}
