//! Debug HTTP endpoint
//!
//! Optional axum server exposing liveness and counter snapshots:
//!
//! - `GET /healthz` → `200 ok`
//! - `GET /stats` → JSON [`ServerStats`]
//!
//! Enabled by `listen_debug` in the config; aborted, not drained, at
//! shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::task::JoinHandle;

use crate::metrics::{FlusherMetrics, PoolMetrics, ServerStats};
use crate::registry::FileRegistry;

/// Shared handles the stats endpoint snapshots on demand
#[derive(Clone)]
pub struct DebugState {
    pub registry: Arc<FileRegistry>,
    pub flusher: Arc<FlusherMetrics>,
    pub router: Arc<PoolMetrics>,
    pub dumper: Arc<PoolMetrics>,
    pub logrotater: Arc<PoolMetrics>,
}

impl DebugState {
    fn stats(&self) -> ServerStats {
        ServerStats {
            flusher: self.flusher.snapshot(),
            router: self.router.snapshot(),
            dumper: self.dumper.snapshot(),
            logrotater: self.logrotater.snapshot(),
            destinations: self.registry.len() as u64,
        }
    }
}

/// Spawn the debug server on `address`
///
/// Bind errors are logged, not fatal: the ingestion path does not
/// depend on the debug endpoint.
pub fn spawn_debug_server(address: String, state: DebugState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let app = Router::new()
            .route("/healthz", get(healthz))
            .route("/stats", get(stats))
            .with_state(state);

        let listener = match tokio::net::TcpListener::bind(&address).await {
            Ok(listener) => {
                tracing::info!(address = %address, "debug endpoint listening");
                listener
            }
            Err(e) => {
                tracing::error!(address = %address, error = %e, "failed to bind debug endpoint");
                return;
            }
        };

        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "debug endpoint error");
        }
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(state): State<DebugState>) -> Json<ServerStats> {
    Json(state.stats())
}
