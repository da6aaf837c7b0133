//! the background expiry worker: a periodic sweep plus a purge queue.

use async_channel::{unbounded, Receiver, Sender};
use async_std::future::timeout;
use async_std::task::JoinHandle;
use log::*;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::store::{deadline, Store};
use crate::error::CacheError;

#[derive(Debug, Clone)]
pub enum Command {
    Purge(String, Instant), // key and the expiry token seen by the reader
    Shutdown,
}

// the handler loop
pub async fn handler<T>(store: Arc<Store<T>>, interval: Duration, rx: Receiver<Command>) {
    let mut next_sweep = deadline(Instant::now(), interval);

    loop {
        // sweep first so a busy purge queue can't starve it
        let now = Instant::now();
        if now >= next_sweep {
            let purged = sweep(&store, now);
            if purged > 0 {
                debug!("sweep purged {} expired entries", purged);
            }
            next_sweep = deadline(now, interval);
            continue;
        }

        match timeout(next_sweep - now, rx.recv()).await {
            Ok(Ok(Command::Purge(key, expires_at))) => {
                if store.purge_expired(&key, expires_at) {
                    debug!("purged expired key: {}", key);
                }
            }
            Ok(Ok(Command::Shutdown)) => {
                info!("sweeper shutdown requested");
                break;
            }
            Ok(Err(_)) => {
                // every sender is gone, the cache was dropped
                debug!("sweeper request channel closed");
                break;
            }
            Err(_) => (), // tick
        }
    }

    rx.close();
}

/// Mark under the read lock, then purge each stale entry on its own write lock.
fn sweep<T>(store: &Store<T>, now: Instant) -> usize {
    store
        .mark(now)
        .into_iter()
        .filter(|(key, expires_at)| store.purge_expired(key, *expires_at))
        .count()
}

pub struct Sweeper {
    interval: Duration,
    request_tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Sweeper {
    /// Start the sweeper as an owned background task.
    ///
    /// Purges take the store's blocking write lock on an async-std worker thread.
    /// A slow `write_thru_lookup` loader holds that lock, so for the length of the
    /// load this task parks one executor thread. Keep loaders short or give the
    /// cache a long enough ttl that misses stay rare.
    pub fn start<T>(store: Arc<Store<T>>, interval: Duration) -> Sweeper
    where
        T: Send + Sync + 'static,
    {
        let (request_tx, request_rx) = unbounded();

        info!("starting sweeper, interval: {:?}", interval);
        let handle = async_std::task::spawn(handler(store, interval, request_rx));

        Sweeper {
            interval,
            request_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Queue a purge of `key` at `expires_at`. Never blocks; once the sweeper
    /// has stopped the request is dropped and the entry lingers until replaced.
    pub fn schedule_purge(&self, key: &str, expires_at: Instant) {
        if self
            .request_tx
            .try_send(Command::Purge(key.to_string(), expires_at))
            .is_err()
        {
            trace!("sweeper stopped, purge of {} not scheduled", key);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Halt the sweeps and wait for the worker to exit. Only the first call
    /// succeeds.
    pub async fn stop(&self) -> Result<(), CacheError> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CacheError::AlreadyStopped)?;

        if self.request_tx.send(Command::Shutdown).await.is_err() {
            warn!("sweeper exited before shutdown was requested");
        }

        handle.await;
        info!("sweeper stopped");

        Ok(())
    }
}
