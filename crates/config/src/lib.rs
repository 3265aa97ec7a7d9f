//! Carrier configuration
//!
//! TOML-based configuration loading with sensible defaults: a minimal
//! config should just work, only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use std::str::FromStr;
//! use carrier_config::Config;
//!
//! let config = Config::from_str("listen = \"127.0.0.1:24224\"").unwrap();
//! assert_eq!(config.listen, "127.0.0.1:24224");
//! ```
//!
//! # Example
//!
//! See `configs/example.toml` for all available options.

mod buffers;
mod compression;
mod error;
mod logging;
mod validation;
mod workers;

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub use buffers::BuffersConfig;
pub use compression::{CompressionConfig, CompressionMethod};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use workers::WorkersConfig;

/// Default bind address for the ingestion listener
const DEFAULT_LISTEN: &str = "0.0.0.0:24224";

/// Default destination directory
const DEFAULT_DEST_DIR: &str = "/var/spool/carrier";

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving destination files; must exist at startup
    pub dest_dir: String,

    /// Mode for directories created beneath `dest_dir`
    pub dest_dir_mode: u32,

    /// Ingestion listener address (host:port)
    pub listen: String,

    /// Optional debug HTTP endpoint (host:port, empty disables)
    pub listen_debug: String,

    /// Optional log file path, overriding `[log] output`
    pub log_file: String,

    /// How long a worker waits for a destination's entry lock
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Compression of destination files
    pub compression: CompressionConfig,

    /// Buffer and channel sizing
    pub buffers: BuffersConfig,

    /// Worker-pool sizing and flusher cadence
    pub workers: WorkersConfig,

    /// Process logging
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dest_dir: DEFAULT_DEST_DIR.into(),
            dest_dir_mode: 0o755,
            listen: DEFAULT_LISTEN.into(),
            listen_debug: String::new(),
            log_file: String::new(),
            wait_timeout: Duration::from_secs(5),
            compression: CompressionConfig::default(),
            buffers: BuffersConfig::default(),
            workers: WorkersConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid
    /// TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Effective log destination: `log_file` wins over `[log] output`
    pub fn log_output(&self) -> LogOutput {
        if self.log_file.is_empty() {
            self.log.output.clone()
        } else {
            LogOutput::File(self.log_file.clone())
        }
    }

    /// Whether the debug HTTP endpoint is enabled
    pub fn debug_enabled(&self) -> bool {
        !self.listen_debug.is_empty()
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dest_dir, DEFAULT_DEST_DIR);
        assert_eq!(config.dest_dir_mode, 0o755);
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert!(config.listen_debug.is_empty());
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
        assert!(!config.debug_enabled());
    }

    #[test]
    fn test_parse_empty() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.compression.method, CompressionMethod::Raw);
    }

    #[test]
    fn test_parse_partial() {
        let toml = r#"
listen = "127.0.0.1:9000"
wait_timeout = "250ms"

[workers]
dumper = 8
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.wait_timeout, Duration::from_millis(250));
        assert_eq!(config.workers.dumper, 8);
        // Defaults still apply elsewhere.
        assert_eq!(config.workers.router, 4);
        assert_eq!(config.buffers.dumps, 1024);
    }

    #[test]
    fn test_parse_full() {
        let toml = r#"
dest_dir = "/srv/logs"
dest_dir_mode = 0o750
listen = "0.0.0.0:7777"
listen_debug = "127.0.0.1:7778"
log_file = "/var/log/carrier.log"
wait_timeout = "10s"

[compression]
method = "zstd"
level = 6

[buffers]
input = 1048576
framing = 131072
zstd_dict = 65536
connections = 512
dumps = 2048
logrotates = 64

[workers]
router = 2
dumper = 6
logrotater = 2
flusher_sleep = "2s"

[log]
level = "debug"
format = "json"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.dest_dir, "/srv/logs");
        assert_eq!(config.dest_dir_mode, 0o750);
        assert!(config.debug_enabled());
        assert_eq!(config.compression.method, CompressionMethod::Zstd);
        assert_eq!(config.compression.level, 6);
        assert_eq!(config.buffers.input, 1048576);
        assert_eq!(config.buffers.zstd_dict, 65536);
        assert_eq!(config.workers.logrotater, 2);
        assert_eq!(config.workers.flusher_sleep, Duration::from_secs(2));
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(
            config.log_output(),
            LogOutput::File("/var/log/carrier.log".into())
        );
    }

    #[test]
    fn test_log_output_defaults_to_section() {
        let config = Config::from_str("[log]\noutput = \"stderr\"").unwrap();
        assert_eq!(config.log_output(), LogOutput::Stderr);
    }
}
