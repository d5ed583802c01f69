//! Image processing module
//!
//! - resize: filter selection and crop-then-scale on decoded images
//! - transformer: decode, resize and re-encode a whole file's bytes
//! - editor: the file-level collaborator the resolution engine calls

pub mod editor;
pub mod resize;
pub mod transformer;

pub use editor::{EditorError, ImageEditor, LocalImageEditor};
pub use resize::ImageResize;
pub use transformer::ImageTransformer;
