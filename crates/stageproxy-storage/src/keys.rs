//! Validation of bucket and file names before they touch the filesystem.

use crate::traits::{StorageError, StorageResult};

/// Bucket is a relative directory such as `2024/05`; empty means the base directory.
pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.starts_with('/') || bucket.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Bucket must be relative: {}",
            bucket
        )));
    }
    if bucket.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Bucket escapes the storage directory: {}",
            bucket
        )));
    }
    Ok(())
}

/// A single path component, never a directory walk.
pub fn validate_file_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Name of the sibling file a write goes to before it is renamed into place.
pub fn temp_file_name(name: &str) -> String {
    format!(".{}.{}.part", name, uuid::Uuid::new_v4())
}
