pub mod attachment;
pub mod engine;
pub mod fallback;
pub mod fetcher;
pub mod rewriter;
