//! Stage Proxy API Library
//!
//! This crate provides the HTTP handlers, application state and setup for the
//! stage proxy server: the uploads catch-all that resolves missing files and
//! the JSON endpoints a host calls to rewrite generated content.

pub mod error;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
