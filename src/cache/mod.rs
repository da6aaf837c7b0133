//! an in-process, time-expiring key/value cache.
//! use cases:
//! * memoizing an expensive liveness probe, e.g., a database ping, for a short ttl
//! * in-memory spot-cache for semi-static configuration settings
//! * any read-mostly value that is costly to compute and fine to serve slightly old
//!
//! Entries carry an absolute expiry. Reads never return stale data; removal of
//! stale entries is deferred to a background sweeper that owns a purge queue and
//! checks the expiry token before each delete, so a refreshed value is never lost.

pub mod store;
pub mod sweeper;
pub mod timed_cache;

pub use timed_cache::TimedCache;
