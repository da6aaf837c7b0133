use std::sync::Arc;
use std::time::{Duration, Instant};

use super::store::{deadline, probe, Entry, Probe, Store};
use super::sweeper::Sweeper;
use crate::config::CacheConfig;
use crate::error::CacheError;

/// the floor for the sweep interval when half the ttl rounds down to nothing
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// the ceiling for the sweep interval, so very long ttls still get swept
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// A time-expiring cache of `T` values keyed by string, with a write-through
/// loader and a background sweeper. Construct one per memoized resource and
/// share it by reference or behind an `Arc`.
#[derive(Debug)]
pub struct TimedCache<T> {
    store: Arc<Store<T>>,
    ttl: Duration,
    sweeper: Sweeper,
}

impl<T> TimedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// create the cache and start its sweeper
    pub fn new(ttl: Duration) -> TimedCache<T> {
        let store = Arc::new(Store::new());
        let sweeper = Sweeper::start(store.clone(), sweep_interval(ttl));

        TimedCache {
            store,
            ttl,
            sweeper,
        }
    }

    /// create the cache from a config, rejecting a negative expiry
    pub fn from_config(config: &CacheConfig) -> Result<TimedCache<T>, CacheError> {
        let ttl = config.expire_after()?;
        Ok(TimedCache::new(ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweeper.interval()
    }

    /// Return the unexpired value for `key`. An expired entry is a miss and its
    /// removal is handed to the sweeper.
    pub fn lookup(&self, key: &str) -> Option<T> {
        let found = {
            let map = self.store.read();
            probe(&map, key, Instant::now())
        };

        self.resolve(key, found)
    }

    /// insert or replace `key`, expiring one ttl from now
    pub fn set(&self, key: &str, value: T) {
        self.store.insert(key, value, self.expires_at());
    }

    /// Return the cached value for `key`, or run `loader` once to produce and
    /// store it. Concurrent misses are serialized on the write lock and the
    /// loser of the race sees the winner's value. A failed load stores nothing.
    pub fn write_thru_lookup<F, E>(&self, key: &str, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let mut map = self.store.write();
        if let Probe::Hit(value) = probe(&map, key, Instant::now()) {
            return Ok(value);
        }

        let value = loader()?;
        map.insert(
            key.to_string(),
            Entry::new(value.clone(), self.expires_at()),
        );

        Ok(value)
    }

    /// the raw entry count, including expired entries not yet swept
    pub fn size(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// drop every entry; loads already in flight will still insert
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Stop the sweeper and wait for it to exit. Call exactly once; a second
    /// call returns `CacheError::AlreadyStopped`.
    pub async fn stop(&self) -> Result<(), CacheError> {
        self.sweeper.stop().await
    }

    fn expires_at(&self) -> Instant {
        deadline(Instant::now(), self.ttl)
    }

    // the read lock is released before the purge is queued
    fn resolve(&self, key: &str, found: Probe<T>) -> Option<T> {
        match found {
            Probe::Hit(value) => Some(value),
            Probe::Expired(expires_at) => {
                self.sweeper.schedule_purge(key, expires_at);
                None
            }
            Probe::Miss => None,
        }
    }
}

/// half the ttl, but never less than `MIN_SWEEP_INTERVAL` when halving yields zero
/// and never more than `MAX_SWEEP_INTERVAL`
pub fn sweep_interval(ttl: Duration) -> Duration {
    let half = ttl / 2;
    if half.is_zero() {
        MIN_SWEEP_INTERVAL
    } else {
        half.min(MAX_SWEEP_INTERVAL)
    }
}
