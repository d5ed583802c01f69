pub mod assets;
pub mod health;
pub mod metadata;
pub mod rewrite;
