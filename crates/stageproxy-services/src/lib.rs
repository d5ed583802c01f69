//! Stage Proxy Services Layer
//!
//! The request-resolution and URL-rewriting engine. Hosts the resolution state
//! machine, the local fallback picker and its decision cache, the remote
//! fetcher, the content rewriter and the attachment helpers, and re-exports the
//! storage and processing collaborators so the API crate depends on a single
//! facade.

pub mod services;

pub use services::attachment::{AttachmentRewriter, ImageSrc, SrcsetSource};
pub use services::engine::{Resolution, ResolutionEngine, MAX_REENTRIES};
pub use services::fallback::{DecisionCache, FallbackPicker, LocalFallback};
pub use services::fetcher::{FetchError, FetchedAsset, HttpFetcher, RemoteFetcher};
pub use services::rewriter::{ContentRewriter, RenderContext};
pub use stageproxy_processing::{
    default_image_sizes, synthesize_size_metadata, AttachmentMetadata, ImageEditor,
    LocalImageEditor, NamedSize, SizeEntry,
};
pub use stageproxy_storage::{
    create_storage, AssetStorage, LocalStorage, StorageError, StorageResult, StoredFile,
};
