//! Per-destination write stacks
//!
//! A [`Bufferer`] is the composite the file registry hands to workers:
//! one destination, one stack, four operations. Two flavors exist,
//! chosen by the configured compression method:
//!
//! - [`RawBufferer`]: `LineWriter → DestFile`
//! - [`ZstdBufferer`]: `LineWriter → ZstdWriter → FrameWriter → DestFile`

use std::io;
use std::path::Path;

use crate::codec::ZstdWriter;
use crate::dest_file::DestFile;
use crate::frame_writer::FrameWriter;
use crate::line_writer::LineWriter;

/// Destination-bound composite exposing the four registry operations
///
/// Callers serialize access through the registry entry lock; a Bufferer
/// itself is single-writer.
pub trait Bufferer: Send {
    /// Append bytes; only whole lines travel past the line buffer
    ///
    /// The whole chunk is consumed; the returned count is the line
    /// buffer's newline-crossed accounting, not the consumed length.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Flush idle-but-dirty layers (line buffer, then frame buffer)
    ///
    /// The codec is never flushed mid-stream; its only finalization
    /// point is [`close`](Self::close).
    fn flush(&mut self) -> io::Result<()>;

    /// Flush and release every layer in order, stopping on first error
    fn close(&mut self) -> io::Result<()>;

    /// Rename the destination file and re-arm the stack over the fresh
    /// live file
    ///
    /// The caller holds the registry entry lock and has already called
    /// [`close`](Self::close); closing again here is a no-op. Partial
    /// lines staged in the line buffer survive rotation and complete
    /// into the new live file.
    fn logrotate(&mut self, new_path: &Path) -> io::Result<()>;
}

/// Creates the Bufferer for a destination key on first use
pub type BuffererFactory = Box<dyn Fn(&str) -> io::Result<Box<dyn Bufferer>> + Send + Sync>;

/// Uncompressed stack: line buffer straight onto the file
pub struct RawBufferer {
    line: LineWriter<DestFile>,
}

impl RawBufferer {
    /// Build over an open destination file with the given line-buffer
    /// capacity
    pub fn new(file: DestFile, input_capacity: usize) -> Self {
        Self {
            line: LineWriter::with_capacity(file, input_capacity),
        }
    }
}

impl Bufferer for RawBufferer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.line.push(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.line.worth_flushing() {
            self.line.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.line.flush()?;
        self.line.get_mut().close()
    }

    fn logrotate(&mut self, new_path: &Path) -> io::Result<()> {
        self.close()?;
        self.line.get_mut().logrotate(new_path)
    }
}

/// Compressed stack: line buffer, zstd frame, frame buffer, file
pub struct ZstdBufferer {
    line: LineWriter<ZstdWriter<FrameWriter<DestFile>>>,
}

/// Sizing and codec parameters for [`ZstdBufferer::new`]
#[derive(Debug, Clone, Copy)]
pub struct ZstdParams {
    /// Line-buffer capacity (bytes)
    pub input_capacity: usize,
    /// Frame-buffer capacity (bytes)
    pub framing_capacity: usize,
    /// Compression level
    pub level: i32,
    /// Dictionary buffer size in bytes (zero disables the dictionary)
    pub dict_size: usize,
}

impl ZstdBufferer {
    /// Build the full compressed stack over an open destination file
    pub fn new(file: DestFile, params: ZstdParams) -> io::Result<Self> {
        let frame = FrameWriter::with_capacity(file, params.framing_capacity);
        let codec = ZstdWriter::with_level(frame, params.level, params.dict_size)?;
        Ok(Self {
            line: LineWriter::with_capacity(codec, params.input_capacity),
        })
    }
}

impl Bufferer for ZstdBufferer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.line.push(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.line.worth_flushing() {
            self.line.flush()?;
        }
        if let Some(frame) = self.line.get_mut().frame_mut() {
            if frame.worth_flushing() {
                frame.flush()?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.line.flush()?;
        let codec = self.line.get_mut();
        codec.close()?;
        let frame = codec.idle_mut()?;
        frame.flush()?;
        frame.get_mut().close()
    }

    fn logrotate(&mut self, new_path: &Path) -> io::Result<()> {
        self.close()?;
        let codec = self.line.get_mut();
        codec.idle_mut()?.get_mut().logrotate(new_path)?;
        codec.reset()
    }
}

#[cfg(test)]
#[path = "bufferer_test.rs"]
mod bufferer_test;
