//! Configuration validation
//!
//! Checks that the server can actually run with the loaded values;
//! existence of `dest_dir` itself is checked at startup, not here.

use crate::{Config, ConfigError, Result};

pub(crate) fn validate(config: &Config) -> Result<()> {
    if config.dest_dir.is_empty() {
        return Err(ConfigError::invalid_value("dest_dir", "must not be empty"));
    }
    if config.listen.is_empty() {
        return Err(ConfigError::invalid_value("listen", "must not be empty"));
    }

    if config.buffers.input == 0 {
        return Err(ConfigError::invalid_value(
            "buffers.input",
            "must be at least 1 byte",
        ));
    }
    if config.buffers.framing == 0 {
        return Err(ConfigError::invalid_value(
            "buffers.framing",
            "must be at least 1 byte",
        ));
    }
    for (field, slots) in [
        ("buffers.connections", config.buffers.connections),
        ("buffers.dumps", config.buffers.dumps),
        ("buffers.logrotates", config.buffers.logrotates),
    ] {
        if slots == 0 {
            return Err(ConfigError::invalid_value(field, "must be at least 1 slot"));
        }
    }

    for (field, count) in [
        ("workers.router", config.workers.router),
        ("workers.dumper", config.workers.dumper),
        ("workers.logrotater", config.workers.logrotater),
    ] {
        if count == 0 {
            return Err(ConfigError::invalid_value(
                field,
                "must be at least 1 worker",
            ));
        }
    }
    if config.workers.flusher_sleep.is_zero() {
        return Err(ConfigError::invalid_value(
            "workers.flusher_sleep",
            "must be greater than zero",
        ));
    }

    if !(0..=22).contains(&config.compression.level) {
        return Err(ConfigError::invalid_value(
            "compression.level",
            format!("{} is outside 0..=22", config.compression.level),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::Config;

    #[test]
    fn test_zero_workers_rejected() {
        let err = Config::from_str("[workers]\ndumper = 0").unwrap_err();
        assert!(err.to_string().contains("workers.dumper"));
    }

    #[test]
    fn test_zero_channel_slots_rejected() {
        let err = Config::from_str("[buffers]\ndumps = 0").unwrap_err();
        assert!(err.to_string().contains("buffers.dumps"));
    }

    #[test]
    fn test_empty_listen_rejected() {
        let err = Config::from_str("listen = \"\"").unwrap_err();
        assert!(err.to_string().contains("listen"));
    }

    #[test]
    fn test_out_of_range_level_rejected() {
        let err = Config::from_str("[compression]\nlevel = 42").unwrap_err();
        assert!(err.to_string().contains("compression.level"));
    }

    #[test]
    fn test_zero_flusher_sleep_rejected() {
        let err = Config::from_str("[workers]\nflusher_sleep = \"0s\"").unwrap_err();
        assert!(err.to_string().contains("flusher_sleep"));
    }
}
