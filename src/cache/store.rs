//! the authoritative key -> entry mapping behind a single read/write lock.

use hashbrown::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

const INITIAL_SIZE: usize = 16;

/// where a deadline saturates when `now + after` would overflow; about a century
pub const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + after`, clamped to `now + FAR_FUTURE` instead of overflowing
pub fn deadline(now: Instant, after: Duration) -> Instant {
    now.checked_add(after)
        .or_else(|| now.checked_add(after.min(FAR_FUTURE)))
        .unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> Entry<T> {
    pub fn new(value: T, expires_at: Instant) -> Entry<T> {
        Entry { value, expires_at }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at < now
    }
}

/// the outcome of a lookup against a locked map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Hit(T),
    /// present but stale; carries the expiry token for the purge
    Expired(Instant),
    Miss,
}

/// Classify `key` without mutating the map. The caller holds the lock.
pub fn probe<T: Clone>(map: &HashMap<String, Entry<T>>, key: &str, now: Instant) -> Probe<T> {
    match map.get(key) {
        Some(entry) if entry.is_expired(now) => Probe::Expired(entry.expires_at),
        Some(entry) => Probe::Hit(entry.value.clone()),
        None => Probe::Miss,
    }
}

#[derive(Debug)]
pub struct Store<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T> Default for Store<T> {
    fn default() -> Store<T> {
        Store::new()
    }
}

impl<T> Store<T> {
    pub fn new() -> Store<T> {
        Store {
            entries: RwLock::new(HashMap::with_capacity(INITIAL_SIZE)),
        }
    }

    // a panic in a loader must not wedge every later caller
    pub fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, key: &str, value: T, expires_at: Instant) {
        let mut map = self.write();
        map.insert(key.to_string(), Entry::new(value, expires_at));
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut map = self.write();
        *map = HashMap::with_capacity(INITIAL_SIZE);
    }

    /// Remove `key` only if its expiry still equals the token observed when the
    /// purge was scheduled; a refreshed entry survives. Returns true on delete.
    pub fn purge_expired(&self, key: &str, expected: Instant) -> bool {
        let mut map = self.write();
        match map.get(key) {
            Some(entry) if entry.expires_at == expected => {
                map.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Scan under the read lock and report every entry that expired before `now`.
    /// Nothing is deleted here.
    pub fn mark(&self, now: Instant) -> Vec<(String, Instant)> {
        let map = self.read();
        map.iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, entry)| (key.clone(), entry.expires_at))
            .collect()
    }
}
