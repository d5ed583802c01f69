//! Stage Proxy Processing Library
//!
//! Image work behind the proxy: producing resize variants from a local
//! original, the dimension math that decides what a variant's real size is,
//! and synthesis of attachment size metadata for files that are never
//! generated up front.

pub mod dimensions;
pub mod image;
pub mod metadata;

pub use dimensions::{constrain_dimensions, resize_dimensions, ResizeDims};
pub use image::{EditorError, ImageEditor, ImageResize, ImageTransformer, LocalImageEditor};
pub use metadata::{
    default_image_sizes, synthesize_size_metadata, AttachmentMetadata, NamedSize, SizeEntry,
};
