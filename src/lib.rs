pub mod align;
pub mod app;
pub mod cli;
pub mod config;
pub mod embed;
pub mod error;
pub mod evidence;
pub mod fusion;
pub mod ingest;
pub mod project;
pub mod query;
pub mod store;

pub use error::{ClipseekError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
