//! Serve command - run the carrier server

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use carrier_config::Config;
use carrier_server::Server;

use crate::logging;

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to /etc/carrier.toml, then
    /// built-in defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    logging::init(&config, args.log_level.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen,
        dest_dir = %config.dest_dir,
        "carrier starting"
    );

    let cancel = CancellationToken::new();
    let mut server = tokio::spawn(Server::new(config).run(cancel.clone()));

    tokio::select! {
        // A fatal startup error (bad bind, missing dest_dir) ends the
        // process without waiting for a signal.
        result = &mut server => finish(result),
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping server");
            cancel.cancel();
            finish(server.await)
        }
    }
}

fn finish(
    result: std::result::Result<
        std::result::Result<(), carrier_server::ServerError>,
        tokio::task::JoinError,
    >,
) -> Result<()> {
    match result {
        Ok(Ok(())) => {
            info!("carrier shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "server error");
            Err(e.into())
        }
        Err(e) => Err(anyhow::anyhow!("server task panicked: {e}")),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => {
            // User explicitly provided a config path - it must exist.
            Config::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => {
            let default_paths = [
                PathBuf::from("/etc/carrier.toml"),
                PathBuf::from("carrier.toml"),
            ];
            for path in &default_paths {
                if path.exists() {
                    info!(config = %path.display(), "using config file");
                    return Config::from_file(path)
                        .with_context(|| format!("failed to load {}", path.display()));
                }
            }
            info!("no config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
