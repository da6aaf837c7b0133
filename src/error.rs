//! errors returned by the cache

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// construction was attempted with a negative expiry
    #[error("expire_after duration cannot be negative, got {0}ms")]
    InvalidDuration(i64),

    /// stop is call-exactly-once
    #[error("the background sweeper has already been stopped")]
    AlreadyStopped,
}
