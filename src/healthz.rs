//! health check support: memoize an expensive liveness probe behind a short ttl.

use anyhow::Result;
use log::*;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;

use crate::cache::TimedCache;
use crate::config::CacheConfig;
use crate::error::CacheError;

pub const HEALTHZ_KEY: &str = "healthz";
pub const OK: &str = "ok";
pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthz {
    pub status: String,
}

impl Healthz {
    pub fn new(healthy: bool) -> Healthz {
        let status = if healthy { OK } else { UNAVAILABLE };
        Healthz {
            status: status.to_string(),
        }
    }
}

/// Runs `probe` at most once per ttl no matter how often `check` is called.
/// Both outcomes are memoized, so a failing dependency is not hammered either.
pub struct HealthCheck<P> {
    cache: TimedCache<bool>,
    probe: P,
}

impl<P> HealthCheck<P>
where
    P: Fn() -> Result<()>,
{
    pub fn new(ttl: Duration, probe: P) -> HealthCheck<P> {
        HealthCheck {
            cache: TimedCache::new(ttl),
            probe,
        }
    }

    pub fn from_config(config: &CacheConfig, probe: P) -> Result<HealthCheck<P>, CacheError> {
        Ok(HealthCheck {
            cache: TimedCache::from_config(config)?,
            probe,
        })
    }

    /// true if the probe (possibly memoized) succeeded
    pub fn check(&self) -> bool {
        let result = self
            .cache
            .write_thru_lookup(HEALTHZ_KEY, || -> Result<bool, Infallible> {
                match (self.probe)() {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        error!("health probe failed: {:?}", e);
                        Ok(false)
                    }
                }
            });

        match result {
            Ok(healthy) => healthy,
            Err(never) => match never {},
        }
    }

    pub fn status(&self) -> Healthz {
        Healthz::new(self.check())
    }

    /// the status as a json body, e.g. `{"status":"ok"}`
    pub fn to_json(&self) -> String {
        let status = self.status();
        match serde_json::to_string(&status) {
            Ok(js) => js,
            Err(e) => {
                error!("healthz json error: {:?}", e);
                format!(r#"{}"status":"{}"{}"#, "{", status.status, "}")
            }
        }
    }

    pub async fn stop(&self) -> Result<(), CacheError> {
        self.cache.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn healthz_json() {
        let js = serde_json::to_string(&Healthz::new(true)).expect("should serialize");
        assert_eq!(js, r#"{"status":"ok"}"#);

        let sts: Healthz =
            serde_json::from_str(r#"{"status":"unavailable"}"#).expect("should parse");
        assert_eq!(sts, Healthz::new(false));
    }

    #[test]
    fn memoized_probe() {
        async_std::task::block_on(async move {
            let count = Arc::new(AtomicUsize::new(0));
            let counter = count.clone();
            let health = HealthCheck::new(Duration::from_secs(60), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

            for _ in 0..10 {
                assert!(health.check());
            }
            assert_eq!(count.load(Ordering::SeqCst), 1);
            assert_eq!(health.to_json(), r#"{"status":"ok"}"#);

            assert!(health.stop().await.is_ok());
        });
    }

    #[test]
    fn failing_probe() {
        async_std::task::block_on(async move {
            let count = Arc::new(AtomicUsize::new(0));
            let counter = count.clone();
            let health = HealthCheck::new(Duration::from_millis(30), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("connection refused"))
            });

            assert_eq!(health.status(), Healthz::new(false));
            assert_eq!(health.to_json(), r#"{"status":"unavailable"}"#);
            assert_eq!(count.load(Ordering::SeqCst), 1);

            // the memo expires and the probe runs again
            async_std::task::sleep(Duration::from_millis(60)).await;
            assert!(!health.check());
            assert_eq!(count.load(Ordering::SeqCst), 2);

            assert!(health.stop().await.is_ok());
        });
    }

    #[test]
    fn negative_config() {
        let result = HealthCheck::from_config(&CacheConfig::new(-1), || Ok(()));
        assert!(matches!(result, Err(CacheError::InvalidDuration(-1))));
    }
}
