//! Carrier - TCP log-collection server
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! carrier
//! carrier --config /etc/carrier.toml
//!
//! # Explicit subcommand
//! carrier serve --config configs/example.toml --log-level debug
//! ```

mod cmd;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Carrier - TCP log-collection server
#[derive(Parser, Debug)]
#[command(name = "carrier")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the carrier server
    Serve(cmd::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(args).await,
        // No subcommand = run the server (default behavior)
        None => {
            let args = cmd::serve::ServeArgs {
                config: cli.config,
                log_level: cli.log_level,
            };
            cmd::serve::run(args).await
        }
    }
}
