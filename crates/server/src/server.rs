//! Server composition and lifecycle
//!
//! [`Server::run`] assembles the registry, flusher, pools, listener and
//! optional debug endpoint from a [`Config`] and runs the accept loop
//! until the cancellation token fires. Shutdown then proceeds in
//! dependency order so nothing is closed while jobs can still reach it:
//!
//! 1. the accept loop exits, dropping the header sender;
//! 2. the router pool drains the header channel and exits, dropping
//!    the dump and rotate senders;
//! 3. the dump and logrotate pools drain and exit;
//! 4. the flusher is stopped last and closes every destination.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use carrier_config::Config;
use carrier_logio::Root;

use crate::debug::{DebugState, spawn_debug_server};
use crate::error::ServerError;
use crate::factory::build_factory;
use crate::jobs::{DumpJob, HeaderJob, LogrotateJob};
use crate::listener::Listener;
use crate::metrics::PoolMetrics;
use crate::pools::{DumpPool, LogrotatePool, RouterContext, RouterPool, default_namer};
use crate::registry::FileRegistry;

/// The assembled carrier server
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a server over a loaded configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until `cancel` fires, then drain and close everything
    ///
    /// Fatal errors (missing destination directory, listener bind
    /// failure) are returned before any job is accepted.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let config = self.config;

        if !Path::new(&config.dest_dir).is_dir() {
            return Err(ServerError::DestDirMissing(config.dest_dir));
        }

        // Bind before spawning anything so a bad address fails fast.
        let listener = Listener::bind(&config.listen).await?;

        let root = Root::new(&config.dest_dir, config.dest_dir_mode);
        let registry = Arc::new(FileRegistry::new(build_factory(root.clone(), &config)));

        // The flusher gets its own stop token: it must outlive the
        // pools so draining jobs still land in open files.
        let flusher_stop = CancellationToken::new();
        let flusher = registry.spawn_flusher(config.workers.flusher_sleep, flusher_stop.clone());

        let (header_tx, header_rx) =
            crossfire::mpmc::bounded_async::<HeaderJob>(config.buffers.connections);
        let (dump_tx, dump_rx) = crossfire::mpmc::bounded_async::<DumpJob>(config.buffers.dumps);
        let (rotate_tx, rotate_rx) =
            crossfire::mpmc::bounded_async::<LogrotateJob>(config.buffers.logrotates);

        let router_metrics = Arc::new(PoolMetrics::new());
        let dumper_metrics = Arc::new(PoolMetrics::new());
        let logrotater_metrics = Arc::new(PoolMetrics::new());

        let router_pool = RouterPool::spawn(
            config.workers.router,
            RouterContext {
                root,
                namer: default_namer(),
                dump_tx,
                rotate_tx,
                metrics: Arc::clone(&router_metrics),
            },
            header_rx,
        );
        let dump_pool = DumpPool::spawn(
            config.workers.dumper,
            Arc::clone(&registry),
            dump_rx,
            config.wait_timeout,
            Arc::clone(&dumper_metrics),
        );
        let rotate_pool = LogrotatePool::spawn(
            config.workers.logrotater,
            Arc::clone(&registry),
            rotate_rx,
            config.wait_timeout,
            Arc::clone(&logrotater_metrics),
        );

        let debug_task = if config.debug_enabled() {
            Some(spawn_debug_server(
                config.listen_debug.clone(),
                DebugState {
                    registry: Arc::clone(&registry),
                    flusher: registry.metrics(),
                    router: Arc::clone(&router_metrics),
                    dumper: Arc::clone(&dumper_metrics),
                    logrotater: Arc::clone(&logrotater_metrics),
                },
            ))
        } else {
            None
        };

        tracing::info!(
            listen = %config.listen,
            dest_dir = %config.dest_dir,
            router_workers = config.workers.router,
            dumper_workers = config.workers.dumper,
            logrotater_workers = config.workers.logrotater,
            "carrier running"
        );

        // Accept until cancelled; returning drops the header sender.
        listener.run(header_tx, cancel).await;

        tracing::info!("draining worker pools");
        router_pool.join().await;
        dump_pool.join().await;
        rotate_pool.join().await;

        // Everything that could write is gone: close the destinations.
        flusher_stop.cancel();
        let _ = flusher.await;

        if let Some(task) = debug_task {
            task.abort();
        }

        let router = router_metrics.snapshot();
        let dumper = dumper_metrics.snapshot();
        let logrotater = logrotater_metrics.snapshot();
        tracing::info!(
            connections = router.jobs,
            connection_errors = router.errors,
            dumps = dumper.jobs,
            dump_errors = dumper.errors,
            rotations = logrotater.jobs,
            rotation_errors = logrotater.errors,
            "carrier stopped"
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
