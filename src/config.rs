//! construction-time configuration for a cache instance

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CacheError;

/// one second, a typical health-check memo window
pub const DEFAULT_EXPIRE_AFTER_MS: i64 = 1000;

/// The expiry is kept signed so that values read from json or the environment
/// can be validated instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub expire_after_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> CacheConfig {
        CacheConfig {
            expire_after_ms: DEFAULT_EXPIRE_AFTER_MS,
        }
    }
}

impl CacheConfig {
    pub fn new(expire_after_ms: i64) -> CacheConfig {
        CacheConfig { expire_after_ms }
    }

    /// parse a config from a json string, e.g. `{"expire_after_ms": 500}`
    pub fn from_json(json: &str) -> Result<CacheConfig> {
        let config: CacheConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// the validated time-to-live
    pub fn expire_after(&self) -> Result<Duration, CacheError> {
        if self.expire_after_ms < 0 {
            return Err(CacheError::InvalidDuration(self.expire_after_ms));
        }

        Ok(Duration::from_millis(self.expire_after_ms as u64))
    }
}
