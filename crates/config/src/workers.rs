//! Worker-pool sizing and flusher cadence

use std::time::Duration;

use serde::Deserialize;

/// Pool sizes for the three worker pools plus the flusher interval
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Router workers reading connection headers
    pub router: usize,

    /// Dumper workers appending bodies through the registry
    pub dumper: usize,

    /// Logrotate workers
    pub logrotater: usize,

    /// Sleep between background flusher ticks
    #[serde(with = "humantime_serde")]
    pub flusher_sleep: Duration,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            router: 4,
            dumper: 4,
            logrotater: 1,
            flusher_sleep: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = WorkersConfig::default();
        assert_eq!(config.router, 4);
        assert_eq!(config.dumper, 4);
        assert_eq!(config.logrotater, 1);
        assert_eq!(config.flusher_sleep, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: WorkersConfig = toml::from_str("flusher_sleep = \"500ms\"").unwrap();
        assert_eq!(config.flusher_sleep, Duration::from_millis(500));
    }
}
