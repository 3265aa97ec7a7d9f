//! Bufferer factory built from configuration
//!
//! The registry constructs one write stack per destination key on first
//! use; which stack it gets is decided here, once, from the compression
//! section of the config.

use carrier_config::{Config, CompressionMethod};
use carrier_logio::{BuffererFactory, RawBufferer, Root, ZstdBufferer, ZstdParams};

/// Build the per-key Bufferer factory for the configured compression
/// method
pub fn build_factory(root: Root, config: &Config) -> BuffererFactory {
    let input_capacity = config.buffers.input;

    match config.compression.method {
        CompressionMethod::Raw => Box::new(move |key: &str| {
            let file = root.open(key)?;
            Ok(Box::new(RawBufferer::new(file, input_capacity)) as Box<dyn carrier_logio::Bufferer>)
        }),
        CompressionMethod::Zstd => {
            let params = ZstdParams {
                input_capacity,
                framing_capacity: config.buffers.framing,
                level: config.compression.level,
                dict_size: config.buffers.zstd_dict,
            };
            Box::new(move |key: &str| {
                let file = root.open(key)?;
                Ok(Box::new(ZstdBufferer::new(file, params)?) as Box<dyn carrier_logio::Bufferer>)
            })
        }
    }
}
