//! Stage Proxy Core Library
//!
//! This crate provides the configuration, error types and the pure path/URL
//! algebra shared by every Stage Proxy component: deployment topology
//! resolution, asset key derivation, remote URL construction and the resize
//! variant filename grammar.

pub mod asset_key;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod mode;
pub mod resize;
pub mod settings;
pub mod topology;

// Re-export commonly used types
pub use asset_key::AssetKey;
pub use codec::{extract_origin_domain, PathCodec, RemoteOrigin};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use mode::ProxyMode;
pub use resize::{RequestedAsset, ResizeDescriptor};
pub use settings::StoredSettings;
pub use topology::{SiteLayout, Topology, TopologyResolver};
