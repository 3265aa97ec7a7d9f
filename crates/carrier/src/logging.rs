//! Tracing subscriber setup from the `[log]` config section

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use carrier_config::{Config, LogFormat, LogOutput};

/// Initialize process logging
///
/// The CLI `--log-level` wins over the config's `[log] level`; the
/// root-level `log_file` wins over `[log] output`.
pub fn init(config: &Config, cli_level: Option<&str>) -> Result<()> {
    let directive = cli_level.unwrap_or_else(|| config.log.level.as_str());
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match (config.log.format, config.log_output()) {
        (LogFormat::Console, LogOutput::Stdout) => {
            registry.with(fmt::layer().with_target(true)).init();
        }
        (LogFormat::Console, LogOutput::Stderr) => {
            registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .init();
        }
        (LogFormat::Console, LogOutput::File(path)) => {
            let file = open_log_file(&path)?;
            registry
                .with(fmt::layer().with_target(true).with_ansi(false).with_writer(file))
                .init();
        }
        (LogFormat::Json, LogOutput::Stdout) => {
            registry.with(fmt::layer().json()).init();
        }
        (LogFormat::Json, LogOutput::Stderr) => {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        (LogFormat::Json, LogOutput::File(path)) => {
            let file = open_log_file(&path)?;
            registry.with(fmt::layer().json().with_writer(file)).init();
        }
    }

    Ok(())
}

fn open_log_file(path: &str) -> Result<Arc<std::fs::File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {path}"))?;
    Ok(Arc::new(file))
}
