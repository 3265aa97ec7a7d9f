//! Compression settings for destination files

use serde::Deserialize;

/// How destination files are written
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// Plain append, no codec (default)
    #[default]
    Raw,
    /// Streaming zstd frames
    Zstd,
}

/// Compression configuration
///
/// # Example
///
/// ```toml
/// [compression]
/// method = "zstd"
/// level = 6
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Codec selection
    pub method: CompressionMethod,

    /// Codec compression level (zstd: 1..=22, 0 means the codec default)
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Raw,
            level: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = CompressionConfig::default();
        assert_eq!(config.method, CompressionMethod::Raw);
        assert_eq!(config.level, 3);
    }

    #[test]
    fn test_deserialize_methods() {
        for (s, expected) in [
            ("raw", CompressionMethod::Raw),
            ("zstd", CompressionMethod::Zstd),
        ] {
            let toml = format!("method = \"{s}\"");
            let config: CompressionConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.method, expected);
        }
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result: std::result::Result<CompressionConfig, _> = toml::from_str("method = \"lzma\"");
        assert!(result.is_err());
    }
}
