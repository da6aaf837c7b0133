#![doc = include_str!("../README.md")]

pub mod cache;
pub mod config;
pub mod error;
pub mod healthz;

pub use cache::TimedCache;
pub use config::CacheConfig;
pub use error::CacheError;

/// the current app version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
