//! Destination file registry with a background flusher
//!
//! [`FileRegistry`] maps destination keys to lazily constructed
//! [`Bufferer`]s. Two locks with very different scopes are involved:
//!
//! - the registry mutex protects the map itself and is only ever held
//!   across map operations, never across I/O;
//! - each entry carries a `tokio::sync::Mutex` around its Bufferer,
//!   held across all I/O on that stack. Workers acquire it blocking
//!   (bounded by the configured wait timeout), the flusher only ever
//!   try-locks so it can never stall an active writer.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use carrier_logio::{Bufferer, BuffererFactory};

use crate::error::ServerError;
use crate::metrics::FlusherMetrics;

/// One registered destination: its key and the locked write stack
pub struct FileEntry {
    name: String,
    bufferer: Mutex<Box<dyn Bufferer>>,
}

impl std::fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry").field("name", &self.name).finish()
    }
}

impl FileEntry {
    /// The destination key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry lock around the write stack
    pub fn bufferer(&self) -> &Mutex<Box<dyn Bufferer>> {
        &self.bufferer
    }
}

/// Process-wide map from destination key to write stack
pub struct FileRegistry {
    entries: StdMutex<HashMap<String, Arc<FileEntry>>>,
    factory: BuffererFactory,
    metrics: Arc<FlusherMetrics>,
}

impl FileRegistry {
    /// Create an empty registry over a Bufferer factory
    pub fn new(factory: BuffererFactory) -> Self {
        Self {
            entries: StdMutex::new(HashMap::new()),
            factory,
            metrics: Arc::new(FlusherMetrics::new()),
        }
    }

    /// Flusher counters, shared with the debug endpoint
    pub fn metrics(&self) -> Arc<FlusherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of registered destinations
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether any destination is registered
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Fetch the entry for a key, constructing it on first use
    ///
    /// Construction (which opens the destination file) runs outside the
    /// registry mutex; if two workers race on a fresh key, one spare
    /// stack is built and immediately dropped. Factory errors are
    /// surfaced without inserting anything.
    pub fn get_file(&self, key: &str) -> io::Result<Arc<FileEntry>> {
        if let Some(entry) = self.lock_entries().get(key) {
            return Ok(Arc::clone(entry));
        }

        let bufferer = (self.factory)(key)?;
        let fresh = Arc::new(FileEntry {
            name: key.to_string(),
            bufferer: Mutex::new(bufferer),
        });

        let mut entries = self.lock_entries();
        let entry = entries.entry(key.to_string()).or_insert(fresh);
        Ok(Arc::clone(entry))
    }

    /// Close and rename a destination's file, leaving the live path
    /// empty
    ///
    /// Fails with [`ServerError::NotFound`] for keys never written to.
    /// The entry lock is acquired blocking, bounded by `wait_timeout`;
    /// it is released on every path out.
    pub async fn logrotate(
        &self,
        key: &str,
        new_path: &Path,
        wait_timeout: Duration,
    ) -> Result<(), ServerError> {
        let entry = self
            .lock_entries()
            .get(key)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(key.to_string()))?;

        let mut bufferer = tokio::time::timeout(wait_timeout, entry.bufferer.lock())
            .await
            .map_err(|_| ServerError::LockTimeout(key.to_string()))?;

        bufferer
            .close()
            .map_err(|e| ServerError::destination(key, e))?;
        bufferer
            .logrotate(new_path)
            .map_err(|e| ServerError::destination(key, e))
    }

    /// Spawn the background flusher
    ///
    /// Each tick snapshots the entry set (registry mutex released
    /// before any I/O), then try-locks every entry: contended entries
    /// are skipped, since the worker holding the lock is draining that
    /// stream by writing to it. Cancellation closes every Bufferer and
    /// ends the task; await the handle to join.
    pub fn spawn_flusher(
        self: &Arc<Self>,
        period: Duration,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(period_ms = period.as_millis() as u64, "flusher started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut scratch: Vec<Arc<FileEntry>> = Vec::new();

            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        registry.close_all().await;
                        break;
                    }
                    _ = ticker.tick() => {
                        registry.flush_tick(&mut scratch);
                    }
                }
            }

            tracing::info!("flusher stopped");
        })
    }

    /// One flusher pass over the current entry set
    fn flush_tick(&self, scratch: &mut Vec<Arc<FileEntry>>) {
        let started = Instant::now();

        scratch.clear();
        scratch.extend(self.lock_entries().values().cloned());

        let mut flushed = 0u64;
        let mut locked = 0u64;
        let mut failed = 0u64;

        for entry in scratch.iter() {
            let Ok(mut bufferer) = entry.bufferer.try_lock() else {
                locked += 1;
                continue;
            };
            match bufferer.flush() {
                Ok(()) => flushed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(destination = %entry.name, error = %e, "flush failed");
                }
            }
        }
        scratch.clear();

        self.metrics.record_tick(flushed, locked, failed);
        if flushed + locked + failed > 0 {
            tracing::info!(
                flushed,
                locked,
                failed,
                duration_us = started.elapsed().as_micros() as u64,
                "flusher tick"
            );
        }
    }

    /// Drain the map and close every destination, logging failures
    async fn close_all(&self) {
        tracing::info!("closing all destinations");

        let drained: Vec<(String, Arc<FileEntry>)> = self.lock_entries().drain().collect();
        for (key, entry) in drained {
            let mut bufferer = entry.bufferer.lock().await;
            match bufferer.close() {
                Ok(()) => tracing::info!(destination = %key, "closed"),
                Err(e) => tracing::error!(destination = %key, error = %e, "failed to close"),
            }
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Arc<FileEntry>>> {
        self.entries.lock().expect("registry mutex poisoned")
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
