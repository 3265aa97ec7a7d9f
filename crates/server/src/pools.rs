//! Fixed-size worker pools over bounded job channels
//!
//! Three pools, each a set of tasks consuming from a shared bounded
//! MPMC channel and exiting when the channel closes:
//!
//! - [`RouterPool`] reads connection headers and turns connections into
//!   dump or logrotate jobs, answering the client once the job
//!   resolves;
//! - [`DumpPool`] appends bodies through the registry under the entry
//!   lock;
//! - [`LogrotatePool`] performs close-rename-reopen through the
//!   registry.
//!
//! Stopping is implicit: drop the senders and `join()` the pool, and the
//! workers drain whatever is still queued and exit.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossfire::{MAsyncRx, MAsyncTx};
use tokio::io::{AsyncReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use carrier_logio::Root;

use crate::error::ServerError;
use crate::jobs::{DumpJob, HeaderJob, LogrotateJob};
use crate::metrics::PoolMetrics;
use crate::protocol::{self, Request};
use crate::registry::FileRegistry;

/// Produces the rotated file name from the live path and the wall clock
pub type RotateNamer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Default namer: `<name>-YYYYMMDDHHMMSS`
pub fn default_namer() -> RotateNamer {
    Arc::new(|name: &str| {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        format!("{name}-{stamp}")
    })
}

// ============================================================================
// Router pool
// ============================================================================

/// Everything a router worker needs, shared across the pool
pub struct RouterContext {
    /// Destination root, for resolving and pre-creating rotate targets
    pub root: Root,
    /// Rotated-name generator
    pub namer: RotateNamer,
    /// Dump job channel
    pub dump_tx: MAsyncTx<DumpJob>,
    /// Logrotate job channel
    pub rotate_tx: MAsyncTx<LogrotateJob>,
    /// Shared counters
    pub metrics: Arc<PoolMetrics>,
}

/// Pool of workers decoding connection headers into jobs
pub struct RouterPool {
    handles: Vec<JoinHandle<()>>,
}

impl RouterPool {
    /// Spawn `size` router workers over the header channel
    ///
    /// The context (and with it the dump and rotate senders) is dropped
    /// when the last worker exits, which closes the downstream channels
    /// and lets the dump and logrotate pools drain in turn.
    pub fn spawn(size: usize, context: RouterContext, rx: MAsyncRx<HeaderJob>) -> Self {
        let context = Arc::new(context);
        let handles = (0..size)
            .map(|worker| {
                let context = Arc::clone(&context);
                let rx = rx.clone();
                tokio::spawn(router_worker(worker, context, rx))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to drain and exit
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn router_worker(worker: usize, context: Arc<RouterContext>, rx: MAsyncRx<HeaderJob>) {
    tracing::debug!(worker, "router worker started");
    while let Ok(job) = rx.recv().await {
        let peer = job.peer;
        match handle_connection(&context, job).await {
            Ok(()) => context.metrics.record_job(),
            Err(e) => {
                context.metrics.record_error();
                tracing::warn!(%peer, error = %e, "connection dropped");
            }
        }
    }
    tracing::debug!(worker, "router worker stopped");
}

/// Serve one connection: header, job, acknowledgement, response
async fn handle_connection(
    context: &RouterContext,
    job: HeaderJob,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(job.stream);
    let request = protocol::read_request(&mut reader).await?;

    match request {
        Request::Dump { key } => {
            let mut body = Vec::new();
            reader
                .read_to_end(&mut body)
                .await
                .map_err(ServerError::Connection)?;

            let (ack_tx, ack_rx) = oneshot::channel();
            context
                .dump_tx
                .send(DumpJob {
                    key,
                    body: Bytes::from(body),
                    ack: Some(ack_tx),
                })
                .await
                .map_err(|_| ServerError::ChannelClosed)?;

            let ok = ack_rx.await.unwrap_or(false);
            protocol::respond(reader.get_mut(), ok)
                .await
                .map_err(ServerError::Connection)
        }
        Request::Logrotate { key } => {
            let live = context.root.resolve(&key);
            let new_path = (context.namer)(&live.to_string_lossy()).into();

            // Parent must exist before the rename target does.
            if let Some(parent) = live.parent() {
                context
                    .root
                    .make_dir(parent)
                    .map_err(|e| ServerError::destination(&key, e))?;
            }

            let (ack_tx, ack_rx) = oneshot::channel();
            context
                .rotate_tx
                .send(LogrotateJob {
                    key,
                    new_path,
                    ack: Some(ack_tx),
                })
                .await
                .map_err(|_| ServerError::ChannelClosed)?;

            let ok = ack_rx.await.unwrap_or(false);
            protocol::respond(reader.get_mut(), ok)
                .await
                .map_err(ServerError::Connection)
        }
    }
}

// ============================================================================
// Dump pool
// ============================================================================

/// Pool of workers appending bodies through the registry
pub struct DumpPool {
    handles: Vec<JoinHandle<()>>,
}

impl DumpPool {
    /// Spawn `size` dump workers over the dump channel
    pub fn spawn(
        size: usize,
        registry: Arc<FileRegistry>,
        rx: MAsyncRx<DumpJob>,
        wait_timeout: Duration,
        metrics: Arc<PoolMetrics>,
    ) -> Self {
        let handles = (0..size)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                let rx = rx.clone();
                let metrics = Arc::clone(&metrics);
                tokio::spawn(dump_worker(worker, registry, rx, wait_timeout, metrics))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to drain and exit
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn dump_worker(
    worker: usize,
    registry: Arc<FileRegistry>,
    rx: MAsyncRx<DumpJob>,
    wait_timeout: Duration,
    metrics: Arc<PoolMetrics>,
) {
    tracing::debug!(worker, "dump worker started");
    while let Ok(job) = rx.recv().await {
        let result = dump(&registry, &job.key, &job.body, wait_timeout).await;
        match &result {
            Ok(()) => metrics.record_job(),
            Err(e) => {
                if matches!(e, ServerError::LockTimeout(_)) {
                    metrics.record_lock_timeout();
                } else {
                    metrics.record_error();
                }
                tracing::error!(destination = %job.key, error = %e, "dump failed");
            }
        }
        if let Some(ack) = job.ack {
            let _ = ack.send(result.is_ok());
        }
    }
    tracing::debug!(worker, "dump worker stopped");
}

/// Append one body under the destination's entry lock
async fn dump(
    registry: &FileRegistry,
    key: &str,
    body: &[u8],
    wait_timeout: Duration,
) -> Result<(), ServerError> {
    let entry = registry
        .get_file(key)
        .map_err(|e| ServerError::destination(key, e))?;

    let mut bufferer = tokio::time::timeout(wait_timeout, entry.bufferer().lock())
        .await
        .map_err(|_| ServerError::LockTimeout(key.to_string()))?;

    // A single write consumes the whole body; the returned count only
    // reflects bytes that crossed a newline boundary.
    bufferer
        .write(body)
        .map(drop)
        .map_err(|e| ServerError::destination(key, e))
}

// ============================================================================
// Logrotate pool
// ============================================================================

/// Pool of workers rotating destination files through the registry
pub struct LogrotatePool {
    handles: Vec<JoinHandle<()>>,
}

impl LogrotatePool {
    /// Spawn `size` logrotate workers over the rotate channel
    pub fn spawn(
        size: usize,
        registry: Arc<FileRegistry>,
        rx: MAsyncRx<LogrotateJob>,
        wait_timeout: Duration,
        metrics: Arc<PoolMetrics>,
    ) -> Self {
        let handles = (0..size)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                let rx = rx.clone();
                let metrics = Arc::clone(&metrics);
                tokio::spawn(rotate_worker(worker, registry, rx, wait_timeout, metrics))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to drain and exit
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn rotate_worker(
    worker: usize,
    registry: Arc<FileRegistry>,
    rx: MAsyncRx<LogrotateJob>,
    wait_timeout: Duration,
    metrics: Arc<PoolMetrics>,
) {
    tracing::debug!(worker, "logrotate worker started");
    while let Ok(job) = rx.recv().await {
        let result = registry
            .logrotate(&job.key, &job.new_path, wait_timeout)
            .await;
        match &result {
            Ok(()) => {
                metrics.record_job();
                tracing::info!(
                    destination = %job.key,
                    rotated_to = %job.new_path.display(),
                    "rotated"
                );
            }
            Err(e) => {
                if matches!(e, ServerError::LockTimeout(_)) {
                    metrics.record_lock_timeout();
                } else {
                    metrics.record_error();
                }
                tracing::error!(destination = %job.key, error = %e, "logrotate failed");
            }
        }
        if let Some(ack) = job.ack {
            let _ = ack.send(result.is_ok());
        }
    }
    tracing::debug!(worker, "logrotate worker stopped");
}

#[cfg(test)]
#[path = "pools_test.rs"]
mod pools_test;
