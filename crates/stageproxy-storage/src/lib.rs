//! Stage Proxy Storage Library
//!
//! Local asset storage used by the resolution engine: bucketed writes of
//! fetched originals, existence checks, byte reads with MIME sniffing and
//! directory listing for the fallback pool.
//!
//! # Bucket layout
//!
//! Fetched files land in `{base_dir}/{bucket}/{name}` where the bucket is the
//! directory part of the asset key (normally `YYYY/MM`). Buckets and names must
//! not contain `..` segments or a leading `/`.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{AssetStorage, StorageError, StorageResult, StoredFile};
