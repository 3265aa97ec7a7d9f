//! Buffer and channel sizing

use serde::Deserialize;

/// Sizes for the per-destination write stack and the job channels
///
/// `input`, `framing` and `zstd_dict` are byte sizes; the remaining
/// fields are channel slot counts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuffersConfig {
    /// Line-integrity buffer capacity per destination (bytes)
    pub input: usize,

    /// Frame buffer capacity in front of the file (bytes)
    pub framing: usize,

    /// Zstd dictionary buffer size (bytes, zero disables)
    pub zstd_dict: usize,

    /// Header-job channel slots (accepted connections awaiting routing)
    pub connections: usize,

    /// Dump-job channel slots
    pub dumps: usize,

    /// Logrotate-job channel slots
    pub logrotates: usize,
}

impl Default for BuffersConfig {
    fn default() -> Self {
        Self {
            input: 2 * 1024 * 1024,
            framing: 256 * 1024,
            zstd_dict: 0,
            connections: 1024,
            dumps: 1024,
            logrotates: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = BuffersConfig::default();
        assert_eq!(config.input, 2 * 1024 * 1024);
        assert_eq!(config.framing, 256 * 1024);
        assert_eq!(config.zstd_dict, 0);
        assert_eq!(config.connections, 1024);
        assert_eq!(config.dumps, 1024);
        assert_eq!(config.logrotates, 256);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BuffersConfig = toml::from_str("input = 4096").unwrap();
        assert_eq!(config.input, 4096);
        assert_eq!(config.framing, 256 * 1024);
    }
}
