//! Counters for the flusher and the worker pools
//!
//! Plain relaxed atomics with point-in-time snapshots; the snapshots
//! serialize for the debug endpoint and are logged at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters kept by the background flusher
#[derive(Debug, Default)]
pub struct FlusherMetrics {
    /// Ticks completed
    pub ticks: AtomicU64,

    /// Entries flushed
    pub flushed: AtomicU64,

    /// Entries skipped because a worker held the lock
    pub locked_skipped: AtomicU64,

    /// Flush calls that returned an error
    pub failed: AtomicU64,
}

impl FlusherMetrics {
    /// Create a new counter set
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
            locked_skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Record one tick's aggregates
    pub fn record_tick(&self, flushed: u64, locked: u64, failed: u64) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.flushed.fetch_add(flushed, Ordering::Relaxed);
        self.locked_skipped.fetch_add(locked, Ordering::Relaxed);
        self.failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Get a snapshot of the counters
    pub fn snapshot(&self) -> FlusherSnapshot {
        FlusherSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            locked_skipped: self.locked_skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`FlusherMetrics`]
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlusherSnapshot {
    pub ticks: u64,
    pub flushed: u64,
    pub locked_skipped: u64,
    pub failed: u64,
}

/// Counters shared by the three worker pools
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Jobs completed successfully
    pub jobs: AtomicU64,

    /// Jobs that failed (logged and dropped)
    pub errors: AtomicU64,

    /// Failures that were lock-wait timeouts
    pub lock_timeouts: AtomicU64,
}

impl PoolMetrics {
    /// Create a new counter set
    pub const fn new() -> Self {
        Self {
            jobs: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            lock_timeouts: AtomicU64::new(0),
        }
    }

    /// Record a completed job
    #[inline]
    pub fn record_job(&self) {
        self.jobs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed job
    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lock-wait timeout (also counted as an error)
    #[inline]
    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the counters
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            jobs: self.jobs.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`PoolMetrics`]
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PoolSnapshot {
    pub jobs: u64,
    pub errors: u64,
    pub lock_timeouts: u64,
}

/// Combined server statistics served by the debug endpoint
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ServerStats {
    pub flusher: FlusherSnapshot,
    pub router: PoolSnapshot,
    pub dumper: PoolSnapshot,
    pub logrotater: PoolSnapshot,
    /// Destinations currently registered
    pub destinations: u64,
}
